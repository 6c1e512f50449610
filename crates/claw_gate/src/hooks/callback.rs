//! Hook callback trait and implementations.

use crate::error::GateError;
use crate::hooks::{HookContext, HookInput, HookResponse};
use async_trait::async_trait;
use std::future::Future;

/// Trait for hook callbacks
///
/// This trait can be implemented directly or used with async functions via
/// the blanket implementation.
///
/// # Examples
///
/// ## Using an async function
///
/// ```no_run
/// use claw_gate::prelude::*;
///
/// async fn no_bash(
///     input: HookInput,
///     _tool_use_id: Option<&str>,
///     _context: &HookContext,
/// ) -> Result<HookResponse, GateError> {
///     if input.tool_name.as_deref() == Some("Bash") {
///         return Ok(HookResponse::deny("Bash not allowed"));
///     }
///     Ok(HookResponse::pass())
/// }
///
/// let _callback = no_bash; // Implements HookCallback
/// ```
///
/// ## Implementing directly
///
/// ```
/// use claw_gate::prelude::*;
/// use async_trait::async_trait;
///
/// struct NoBash;
///
/// #[async_trait]
/// impl HookCallback for NoBash {
///     async fn call(
///         &self,
///         input: HookInput,
///         _tool_use_id: Option<&str>,
///         _context: &HookContext,
///     ) -> Result<HookResponse, GateError> {
///         if input.tool_name.as_deref() == Some("Bash") {
///             return Ok(HookResponse::deny("Bash not allowed"));
///         }
///         Ok(HookResponse::pass())
///     }
/// }
/// ```
#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Invoke the hook callback
    ///
    /// # Arguments
    ///
    /// * `input` - Input data for the hook (tool name, parameters, etc.)
    /// * `tool_use_id` - Optional tool use ID (for tool-related events)
    /// * `context` - Session context (session id, permission mode)
    async fn call(
        &self,
        input: HookInput,
        tool_use_id: Option<&str>,
        context: &HookContext,
    ) -> Result<HookResponse, GateError>;
}

/// Blanket implementation for async functions and closures
#[async_trait]
impl<F, Fut> HookCallback for F
where
    F: Fn(HookInput, Option<&str>, &HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HookResponse, GateError>> + Send,
{
    async fn call(
        &self,
        input: HookInput,
        tool_use_id: Option<&str>,
        context: &HookContext,
    ) -> Result<HookResponse, GateError> {
        self(input, tool_use_id, context).await
    }
}
