//! Risk event kinds recorded in the audit trail.

/// Typed risk events; the ledger stores the wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskEventKind {
    PartialFill,
    Reject,
    WsDisconnect,
    RiskLimit,
    ExecutionError,
    KillSwitch,
}

impl RiskEventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PartialFill => "partial_fill",
            Self::Reject => "reject",
            Self::WsDisconnect => "ws_disconnect",
            Self::RiskLimit => "risk_limit",
            Self::ExecutionError => "execution_error",
            Self::KillSwitch => "kill_switch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_match_ledger_rows() {
        assert_eq!(RiskEventKind::PartialFill.as_str(), "partial_fill");
        assert_eq!(RiskEventKind::WsDisconnect.as_str(), "ws_disconnect");
        assert_eq!(RiskEventKind::KillSwitch.as_str(), "kill_switch");
    }
}
