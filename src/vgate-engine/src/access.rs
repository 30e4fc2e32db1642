use tracing::debug;
use vgate_core::{CallerGrant, GrantLookup};
use vgate_errors::Denial;

/// Checks a resolved version name against the caller's grant on the
/// specification that received the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide with an already fetched grant. No grant authorizes nothing.
    pub fn check(&self, grant: Option<&CallerGrant>, spec_id: &str, version: &str) -> Result<(), Denial> {
        match grant {
            Some(g) if g.allows(version) => Ok(()),
            _ => Err(Denial::AccessDisallowed {
                spec_id: spec_id.to_string(),
                name: version.to_string(),
            }),
        }
    }

    /// Fetch the grant for `caller_token` and decide.
    pub fn authorize(
        &self,
        grants: &dyn GrantLookup,
        caller_token: Option<&str>,
        spec_id: &str,
        version: &str,
    ) -> Result<(), Denial> {
        let grant = caller_token.and_then(|t| grants.grant(t, spec_id));
        debug!(spec = spec_id, version, has_grant = grant.is_some(), "access check");
        self.check(grant.as_deref(), spec_id, version)
    }
}
