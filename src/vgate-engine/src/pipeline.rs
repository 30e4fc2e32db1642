use crate::access::AccessGate;
use crate::decision::DispatchDecision;
use crate::request::InboundRequest;
use crate::resolver::VersionResolver;
use crate::rules::{PathRuleEngine, RuleOutcome};
use chrono::{DateTime, Utc};
use tracing::debug;
use vgate_core::{GrantLookup, Snapshot};
use vgate_errors::Denial;

/// Header carrying the caller token unless configured otherwise.
pub const DEFAULT_AUTH_HEADER: &str = "authorization";

/// Runs bypass, resolution, access and path rules for one request.
#[derive(Debug, Clone)]
pub struct Engine {
    auth_header: String,
    resolver: VersionResolver,
    gate: AccessGate,
    rules: PathRuleEngine,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(DEFAULT_AUTH_HEADER)
    }
}

impl Engine {
    pub fn new(auth_header: impl Into<String>) -> Self {
        let auth_header = auth_header.into();
        Self {
            auth_header: if auth_header.trim().is_empty() {
                DEFAULT_AUTH_HEADER.to_string()
            } else {
                auth_header.trim().to_ascii_lowercase()
            },
            resolver: VersionResolver::new(),
            gate: AccessGate::new(),
            rules: PathRuleEngine::new(),
        }
    }

    pub fn auth_header(&self) -> &str {
        &self.auth_header
    }

    pub fn evaluate(&self, snapshot: &Snapshot, grants: &dyn GrantLookup, req: &InboundRequest) -> DispatchDecision {
        self.evaluate_at(snapshot, grants, req, Utc::now())
    }

    /// Same as [`Engine::evaluate`] with a fixed clock for expiry checks.
    pub fn evaluate_at(
        &self,
        snapshot: &Snapshot,
        grants: &dyn GrantLookup,
        req: &InboundRequest,
        now: DateTime<Utc>,
    ) -> DispatchDecision {
        let decision = self.run(snapshot, grants, req, now);
        debug!(request = %req.id, method = %req.method, path = %req.path, decision = decision.kind(), "request evaluated");
        decision
    }

    fn run(
        &self,
        snapshot: &Snapshot,
        grants: &dyn GrantLookup,
        req: &InboundRequest,
        now: DateTime<Utc>,
    ) -> DispatchDecision {
        let Some(found) = snapshot.find_spec(&req.path) else {
            return DispatchDecision::denied(Denial::SpecificationNotFound { path: req.path.clone() });
        };
        let spec = found.spec;
        let sub_path = found.sub_path;
        debug!(request = %req.id, spec = %spec.id, sub_path = %sub_path, "specification matched");

        if self.rules.is_bypassed(&spec, &sub_path) {
            return DispatchDecision::Forward {
                path: sub_path,
                target_host: spec.override_target_host.clone(),
                specification_id: spec.id.clone(),
                version: None,
                bypassed: true,
            };
        }

        let resolved = match self.resolver.resolve_at(&spec, req, &sub_path, now) {
            Ok(r) => r,
            Err(denial) => {
                debug!(request = %req.id, spec = %spec.id, code = denial.code(), "resolution failed");
                return DispatchDecision::denied(denial);
            }
        };
        debug!(
            request = %req.id,
            version = %resolved.version.name,
            effective = %resolved.effective.id,
            "version resolved"
        );

        let token = req.header_value(&self.auth_header);
        if let Err(denial) = self.gate.authorize(grants, token, &resolved.authorizing.id, &resolved.version.name) {
            return DispatchDecision::denied(denial);
        }

        let forward = |path: String, bypassed: bool| DispatchDecision::Forward {
            path,
            target_host: resolved.target_host().map(str::to_string),
            specification_id: resolved.effective.id.clone(),
            version: Some(resolved.effective_version.name.clone()),
            bypassed,
        };

        match self
            .rules
            .evaluate(resolved.effective_version.path_rules.as_ref(), &req.method, &resolved.path)
        {
            RuleOutcome::Bypass => forward(resolved.path.clone(), true),
            RuleOutcome::Reply(rule) => DispatchDecision::Reply {
                status_code: rule.status.as_u16(),
                body: rule.body.clone(),
                headers: rule.headers.clone(),
            },
            RuleOutcome::Rewrite(path) => {
                debug!(request = %req.id, from = %resolved.path, to = %path, "path rewritten");
                forward(path, false)
            }
            RuleOutcome::PassThrough => forward(resolved.path.clone(), false),
        }
    }
}
