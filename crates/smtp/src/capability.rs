//! ESMTP capability/extension registry advertised on `EHLO`.
//!
//! Generalizes a fixed bitflag set into an ordered name -> value registry,
//! since extensions like `SIZE` and `AUTH` carry parameters rather than
//! being simple booleans.

use std::fmt;

/// A single advertised value: either a bare flag (`PIPELINING`) or a
/// parameterized one (`SIZE 10485670`, `AUTH PLAIN LOGIN`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Flag,
    Param(String),
}

/// Ordered set of advertised ESMTP extensions, keyed case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    entries: Vec<(String, Value)>,
}

impl Capabilities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in set every session starts EHLO negotiation with:
    /// `SIZE`, `8BITMIME`, `PIPELINING`.
    #[must_use]
    pub fn builtin(size_limit: u64) -> Self {
        let mut caps = Self::new();
        caps.set_param("SIZE", size_limit.to_string());
        caps.set_flag("8BITMIME");
        caps.set_flag("PIPELINING");
        caps
    }

    pub fn set_flag(&mut self, name: impl Into<String>) {
        self.set(name, Value::Flag);
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.set(name, Value::Param(value.into()));
    }

    fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

/// Renders the multi-line `250-`/`250 ` EHLO response body (the greeting
/// line plus one line per advertised capability).
pub fn format_ehlo_response(hostname: &str, capabilities: &Capabilities) -> String {
    use std::fmt::Write;

    let mut out = format!("250-{hostname}\r\n");
    let mut lines = capabilities.iter().peekable();

    if lines.peek().is_none() {
        out.truncate(out.len() - 3);
        out.push_str("\r\n");
        return out;
    }

    while let Some((name, value)) = lines.next() {
        let sep = if lines.peek().is_some() { '-' } else { ' ' };
        match value {
            Value::Flag => writeln!(out, "250{sep}{name}\r").unwrap(),
            Value::Param(v) => writeln!(out, "250{sep}{name} {v}\r").unwrap(),
        }
    }

    out
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            match value {
                Value::Flag => writeln!(f, "{name}")?,
                Value::Param(v) => writeln!(f, "{name} {v}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set() {
        let caps = Capabilities::builtin(10_485_670);
        assert!(caps.contains("size"));
        assert!(caps.contains("8BITMIME"));
        assert!(caps.contains("PIPELINING"));
    }

    #[test]
    fn case_insensitive_lookup() {
        let mut caps = Capabilities::new();
        caps.set_flag("STARTTLS");
        assert!(caps.contains("starttls"));
        caps.remove("StartTLS");
        assert!(!caps.contains("STARTTLS"));
    }

    #[test]
    fn ehlo_formatting() {
        let mut caps = Capabilities::new();
        caps.set_flag("PIPELINING");
        caps.set_param("SIZE", "1024");
        caps.set_param("AUTH", "PLAIN LOGIN");

        let rendered = format_ehlo_response("mail.example.com", &caps);
        assert_eq!(
            rendered.split("\r\n").collect::<Vec<_>>(),
            [
                "250-mail.example.com",
                "250-PIPELINING",
                "250-SIZE 1024",
                "250 AUTH PLAIN LOGIN",
                ""
            ]
        );
    }
}
