//! Session memory of approved commands and domains.
//!
//! When the user answers a prompt with "always allow", the runtime adapter
//! records the approval here; the next evaluation of a similar call consults it
//! through [`CommandKnowledge`].
//!
//! # Example
//!
//! ```
//! use claw_gate::collaborators::CommandKnowledge;
//! use claw_gate::knowledge::SessionKnowledge;
//!
//! let mut knowledge = SessionKnowledge::new();
//! knowledge.whitelist_command("npm");
//! knowledge.whitelist_domain("api.github.com");
//!
//! assert!(knowledge.is_whitelisted("npm"));
//! assert_eq!(knowledge.base_command("/usr/bin/npm test"), "npm");
//! assert_eq!(
//!     knowledge.extract_domain("curl -s https://api.github.com/repos").as_deref(),
//!     Some("api.github.com")
//! );
//! assert!(knowledge.is_dangerous("rm"));
//! ```

use std::collections::HashSet;
use url::Url;

use crate::collaborators::CommandKnowledge;
use crate::shell::{SimpleCommand, parse, program_basename};

/// Commands that are never auto-approved from the session whitelist
pub const DANGEROUS_COMMANDS: &[&str] = &[
    "chmod", "chown", "dd", "doas", "eval", "exec", "kill", "killall", "mkfs", "mv", "pkill",
    "reboot", "rm", "rmdir", "shred", "shutdown", "su", "sudo", "truncate",
];

/// Programs whose network target is checked against the domain whitelist
pub const NETWORK_COMMANDS: &[&str] = &["curl", "wget"];

/// In-memory [`CommandKnowledge`] for one session
#[derive(Debug, Clone, Default)]
pub struct SessionKnowledge {
    whitelisted: HashSet<String>,
    domains: HashSet<String>,
}

impl SessionKnowledge {
    /// Create empty knowledge
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an approved base command
    pub fn whitelist_command(&mut self, command: impl Into<String>) {
        self.whitelisted.insert(command.into());
    }

    /// Remember an approved tool name
    pub fn whitelist_tool(&mut self, tool_name: impl Into<String>) {
        self.whitelisted.insert(tool_name.into());
    }

    /// Remember an approved network domain
    pub fn whitelist_domain(&mut self, domain: impl Into<String>) {
        self.domains.insert(domain.into().to_ascii_lowercase());
    }

    /// Forget every approval
    pub fn clear(&mut self) {
        self.whitelisted.clear();
        self.domains.clear();
    }
}

/// Option tables for a network program
struct NetworkFlags {
    /// Short options that consume a value
    value_short: &'static str,
    /// Long options (without `--`) that consume a value
    value_long: &'static [&'static str],
    /// Options that change where the request goes or load extra targets
    reroute: &'static [&'static str],
    /// Multi-letter short switches that take no value
    switches: &'static [&'static str],
}

static CURL_FLAGS: NetworkFlags = NetworkFlags {
    value_short: "AbcCdDeEFHKmoPQrtTuUwxXyYz",
    value_long: &[
        "abstract-unix-socket", "alt-svc", "aws-sigv4", "cacert", "capath", "cert", "cert-type",
        "ciphers", "config", "connect-timeout", "connect-to", "continue-at", "cookie",
        "cookie-jar", "create-file-mode", "data", "data-ascii", "data-binary", "data-raw",
        "data-urlencode", "dns-servers", "doh-url", "dump-header", "etag-compare", "etag-save",
        "expect100-timeout", "form", "form-string", "ftp-port", "header", "hsts", "interface",
        "json", "keepalive-time", "key", "key-type", "limit-rate", "local-port", "login-options",
        "mail-from", "mail-rcpt", "max-filesize", "max-redirs", "max-time", "netrc-file",
        "noproxy", "oauth2-bearer", "output", "output-dir", "pinnedpubkey", "preproxy", "proto",
        "proto-redir", "proxy", "proxy-header", "proxy-user", "quote", "range", "rate", "referer",
        "request", "resolve", "retry", "retry-delay", "retry-max-time", "sasl-authzid",
        "service-name", "socks4", "socks4a", "socks5", "socks5-hostname", "speed-limit",
        "speed-time", "stderr", "telnet-option", "time-cond", "tls-max", "trace", "trace-ascii",
        "unix-socket", "upload-file", "url", "user", "user-agent", "variable", "write-out",
    ],
    reroute: &[
        "-x", "-K", "--proxy", "--preproxy", "--config", "--resolve", "--connect-to", "--socks4",
        "--socks4a", "--socks5", "--socks5-hostname", "--unix-socket", "--abstract-unix-socket",
        "--doh-url",
    ],
    switches: &[],
};

static WGET_FLAGS: NetworkFlags = NetworkFlags {
    value_short: "oaeiBtOTwQPUlARDIX",
    value_long: &[
        "accept", "append-output", "base", "bind-address", "body-data", "body-file",
        "ca-certificate", "certificate", "config", "connect-timeout", "default-page",
        "directory-prefix", "dns-timeout", "domains", "exclude-directories", "exclude-domains",
        "execute", "follow-tags", "header", "http-password", "http-user", "ignore-tags",
        "include-directories", "input-file", "level", "limit-rate", "load-cookies", "method",
        "output-document", "output-file", "password", "post-data", "post-file", "private-key",
        "proxy-password", "proxy-user", "quota", "read-timeout", "referer", "reject",
        "restrict-file-names", "save-cookies", "timeout", "tries", "user", "user-agent", "wait",
        "waitretry",
    ],
    reroute: &["-e", "-i", "--execute", "--input-file", "--config"],
    switches: &["-nc", "-nd", "-nH", "-np", "-nv"],
};

fn flags_for(program: &str) -> Option<&'static NetworkFlags> {
    match program {
        "curl" => Some(&CURL_FLAGS),
        "wget" => Some(&WGET_FLAGS),
        _ => None,
    }
}

/// Host of a URL-like argument; bare hosts get an implied `https://`
fn host_of(arg: &str) -> Option<String> {
    let parsed = match Url::parse(arg) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if arg.contains('.') => {
            Url::parse(&format!("https://{arg}")).ok()?
        }
        Err(_) => return None,
    };
    if !matches!(parsed.scheme(), "http" | "https" | "ftp") {
        return None;
    }
    parsed.host_str().map(str::to_ascii_lowercase)
}

/// Target URLs of one `curl`/`wget` invocation, skipping option values
///
/// `None` when the command reroutes the request (proxies, config files,
/// environment assignments) and the targets cannot be trusted.
fn request_targets<'a>(cmd: &'a SimpleCommand, flags: &NetworkFlags) -> Option<Vec<&'a str>> {
    if !cmd.assignments.is_empty() {
        return None;
    }
    let mut targets = Vec::new();
    let mut args = cmd.args();
    let mut options_done = false;

    while let Some(arg) = args.next() {
        if options_done || arg == "-" || !arg.starts_with('-') {
            targets.push(arg);
            continue;
        }
        if arg == "--" {
            options_done = true;
            continue;
        }
        if let Some(long) = arg.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, value)) => (name, Some(value)),
                None => (long, None),
            };
            if flags.reroute.contains(&format!("--{name}").as_str()) {
                return None;
            }
            if flags.value_long.contains(&name) {
                let value = match inline {
                    Some(value) => Some(value),
                    None => args.next(),
                };
                if name == "url" {
                    targets.push(value?);
                }
            }
            continue;
        }
        if flags.switches.contains(&arg) {
            continue;
        }
        let short = &arg[1..];
        for (pos, flag) in short.char_indices() {
            if flags.reroute.contains(&format!("-{flag}").as_str()) {
                return None;
            }
            if flags.value_short.contains(flag) {
                if pos + flag.len_utf8() == short.len() {
                    args.next();
                }
                break;
            }
        }
    }
    Some(targets)
}

impl CommandKnowledge for SessionKnowledge {
    fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelisted.contains(name)
    }

    fn is_dangerous(&self, name: &str) -> bool {
        DANGEROUS_COMMANDS.contains(&program_basename(name))
    }

    fn base_command(&self, command: &str) -> String {
        let program = match parse(command) {
            Ok(list) => list.program_names().first().map(|p| p.to_string()),
            Err(_) => command
                .split_whitespace()
                .find(|w| !w.contains('='))
                .map(str::to_string),
        };
        program
            .map(|p| program_basename(&p).to_string())
            .unwrap_or_default()
    }

    fn extract_domain(&self, command: &str) -> Option<String> {
        self.extract_domains(command).into_iter().next()
    }

    fn extract_domains(&self, command: &str) -> Vec<String> {
        let Ok(list) = parse(command) else {
            return Vec::new();
        };
        let mut hosts = Vec::new();
        for cmd in list.commands() {
            let Some(flags) = cmd.program().and_then(|p| flags_for(program_basename(p))) else {
                continue;
            };
            let Some(targets) = request_targets(cmd, flags) else {
                return Vec::new();
            };
            for target in targets {
                match host_of(target) {
                    Some(host) => hosts.push(host),
                    // A target without a recognisable host cannot be vetted.
                    None => return Vec::new(),
                }
            }
        }
        hosts
    }

    fn is_domain_whitelisted(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        self.domains.contains(&domain)
    }
}
