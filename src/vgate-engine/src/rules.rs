//! Path rule evaluation for one version entry.
//!
//! Precedence is fixed: bypass, then static replies, then rewrites, then
//! pass-through. Bypass and reply paths match exactly; rewrites match their
//! anchored pattern against the whole path.

use http::Method;
use vgate_core::{ApiSpecification, PathRuleSet, StaticReplyRule};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome<'a> {
    Bypass,
    Reply(&'a StaticReplyRule),
    Rewrite(String),
    PassThrough,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PathRuleEngine;

impl PathRuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Bypass lookup done before any version is resolved.
    pub fn is_bypassed(&self, spec: &ApiSpecification, path: &str) -> bool {
        spec.is_bypassed(path)
    }

    pub fn evaluate<'a>(&self, rules: Option<&'a PathRuleSet>, method: &Method, path: &str) -> RuleOutcome<'a> {
        let Some(rules) = rules else {
            return RuleOutcome::PassThrough;
        };

        if rules.bypass.contains(path) {
            return RuleOutcome::Bypass;
        }

        if let Some(reply) = rules
            .static_replies
            .iter()
            .find(|r| r.path == path && r.method == *method)
        {
            return RuleOutcome::Reply(reply);
        }

        for rw in rules.rewrites.iter().filter(|r| r.applies_to(method)) {
            if let Some(caps) = rw.regex.captures(path) {
                let mut out = String::new();
                caps.expand(&rw.replacement, &mut out);
                return RuleOutcome::Rewrite(out);
            }
        }

        RuleOutcome::PassThrough
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vgate_core::{PathRulesDef, RewriteDef, SpecificationDef, StaticReplyDef, VersionDef};

    fn rules() -> PathRuleSet {
        let def = SpecificationDef::new("test").with_version(
            "v2",
            VersionDef::default().with_rules(PathRulesDef {
                bypass: vec!["/ignore".into(), "/mock".into()],
                static_replies: vec![
                    StaticReplyDef {
                        path: "/mock".into(),
                        method: "GET".into(),
                        status_code: 200,
                        ..Default::default()
                    },
                    StaticReplyDef {
                        path: "/reply".into(),
                        method: "POST".into(),
                        status_code: 201,
                        ..Default::default()
                    },
                ],
                rewrites: vec![
                    RewriteDef {
                        path: "/a".into(),
                        method: Some("GET".into()),
                        match_pattern: "/a(.*)".into(),
                        replacement: "/b".into(),
                    },
                    RewriteDef {
                        path: "/users".into(),
                        method: None,
                        match_pattern: "/users/(?P<id>[0-9]+)".into(),
                        replacement: "/people/${id}".into(),
                    },
                ],
            }),
        );
        let spec = ApiSpecification::from_def(&def).unwrap();
        spec.implicit_version().unwrap().path_rules.clone().unwrap()
    }

    #[test]
    fn no_rules_pass_through() {
        let e = PathRuleEngine::new();
        assert_eq!(e.evaluate(None, &Method::GET, "/x"), RuleOutcome::PassThrough);
    }

    #[test]
    fn bypass_beats_static_reply() {
        let r = rules();
        let e = PathRuleEngine::new();
        assert_eq!(e.evaluate(Some(&r), &Method::GET, "/mock"), RuleOutcome::Bypass);
        assert_eq!(e.evaluate(Some(&r), &Method::DELETE, "/ignore"), RuleOutcome::Bypass);
    }

    #[test]
    fn static_reply_needs_path_and_method() {
        let r = rules();
        let e = PathRuleEngine::new();
        match e.evaluate(Some(&r), &Method::POST, "/reply") {
            RuleOutcome::Reply(rule) => assert_eq!(rule.status.as_u16(), 201),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(e.evaluate(Some(&r), &Method::GET, "/reply"), RuleOutcome::PassThrough);
    }

    #[test]
    fn rewrites_match_whole_path_and_method() {
        let r = rules();
        let e = PathRuleEngine::new();
        assert_eq!(
            e.evaluate(Some(&r), &Method::GET, "/a/extra"),
            RuleOutcome::Rewrite("/b".into())
        );
        assert_eq!(e.evaluate(Some(&r), &Method::POST, "/a"), RuleOutcome::PassThrough);
        assert_eq!(e.evaluate(Some(&r), &Method::GET, "/x/a"), RuleOutcome::PassThrough);
        assert_eq!(
            e.evaluate(Some(&r), &Method::PUT, "/users/42"),
            RuleOutcome::Rewrite("/people/42".into())
        );
        assert_eq!(e.evaluate(Some(&r), &Method::PUT, "/users/42/x"), RuleOutcome::PassThrough);
    }
}
