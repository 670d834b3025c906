//! Parsing for the normative handle-id grammar: `input:<name>`,
//! `output:<name>`, an optional `:internal` suffix, and
//! `dock:<slot>:<prev|current|output|input>` for loop dock ports.

/// Which side of a loop dock port a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockRole {
    Prev,
    Current,
    Output,
    Input,
}

impl DockRole {
    fn parse(s: &str) -> Option<DockRole> {
        match s {
            "prev" => Some(DockRole::Prev),
            "current" => Some(DockRole::Current),
            "output" => Some(DockRole::Output),
            "input" => Some(DockRole::Input),
            _ => None,
        }
    }
}

/// A parsed handle id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    Input { name: String, internal: bool },
    Output { name: String, internal: bool },
    Dock { slot: String, role: DockRole },
    /// Anything not matching the known grammar is kept verbatim so callers
    /// can still compare/display it without panicking on unknown input.
    Unknown(String),
}

impl Handle {
    pub fn parse(raw: &str) -> Handle {
        if let Some(rest) = raw.strip_prefix("dock:") {
            if let Some((slot, role)) = rest.rsplit_once(':') {
                if let Some(role) = DockRole::parse(role) {
                    return Handle::Dock { slot: slot.to_string(), role };
                }
            }
            return Handle::Unknown(raw.to_string());
        }
        if let Some(rest) = raw.strip_prefix("input:") {
            let (name, internal) = strip_internal(rest);
            return Handle::Input { name: name.to_string(), internal };
        }
        if let Some(rest) = raw.strip_prefix("output:") {
            let (name, internal) = strip_internal(rest);
            return Handle::Output { name: name.to_string(), internal };
        }
        Handle::Unknown(raw.to_string())
    }

    /// The port name this handle refers to, stripped of direction prefix
    /// and `:internal` suffix. Used to group incoming edges by target port.
    pub fn port_name(&self) -> String {
        match self {
            Handle::Input { name, .. } | Handle::Output { name, .. } => name.clone(),
            Handle::Dock { slot, .. } => slot.clone(),
            Handle::Unknown(raw) => raw.clone(),
        }
    }

    pub fn is_dock(&self) -> bool {
        matches!(self, Handle::Dock { .. })
    }
}

fn strip_internal(rest: &str) -> (&str, bool) {
    match rest.strip_suffix(":internal") {
        Some(name) => (name, true),
        None => (rest, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_input_and_output() {
        assert_eq!(
            Handle::parse("input:needed"),
            Handle::Input { name: "needed".into(), internal: false }
        );
        assert_eq!(
            Handle::parse("output:stdout:internal"),
            Handle::Output { name: "stdout".into(), internal: true }
        );
    }

    #[test]
    fn parses_dock_handles() {
        assert_eq!(
            Handle::parse("dock:accumulator:prev"),
            Handle::Dock { slot: "accumulator".into(), role: DockRole::Prev }
        );
        assert_eq!(
            Handle::parse("dock:continue:current"),
            Handle::Dock { slot: "continue".into(), role: DockRole::Current }
        );
    }

    #[test]
    fn unknown_grammar_is_preserved_not_panicked() {
        assert_eq!(Handle::parse("weird"), Handle::Unknown("weird".into()));
    }
}
