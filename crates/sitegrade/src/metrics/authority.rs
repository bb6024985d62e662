//! Off-site authority metrics (701–703), fed by the authority provider.

use crate::metrics::context::EvalContext;
use crate::metrics::linear;
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::providers::authority::AuthoritySignals;

const DOMAIN_AUTHORITY: MetricId = MetricId(701);
const REFERRING_DOMAINS: MetricId = MetricId(702);
const TOXIC_BACKLINKS: MetricId = MetricId(703);

pub fn domain_authority(ctx: &EvalContext<'_>) -> MetricResult {
    with_signals(ctx, DOMAIN_AUTHORITY, |s| {
        let da = s.domain_authority?;
        Some(MetricResult::measured(
            DOMAIN_AUTHORITY,
            MetricValue::Number(da),
            da,
            format!("domain authority {da:.0}"),
        ))
    })
}

pub fn referring_domains(ctx: &EvalContext<'_>) -> MetricResult {
    with_signals(ctx, REFERRING_DOMAINS, |s| {
        let rd = s.referring_domains?;
        // 10 → 26, 100 → 50, 10k → 100
        let subscore = (25.0 * ((rd + 1) as f64).log10()).min(100.0);
        Some(MetricResult::measured(
            REFERRING_DOMAINS,
            MetricValue::Count(rd),
            subscore,
            format!("{rd} referring domains"),
        ))
    })
}

pub fn toxic_backlinks(ctx: &EvalContext<'_>) -> MetricResult {
    with_signals(ctx, TOXIC_BACKLINKS, |s| {
        let toxic = s.toxic_backlinks?;
        let total = s.backlinks?;
        if total == 0 {
            return Some(MetricResult::measured(
                TOXIC_BACKLINKS,
                MetricValue::Count(toxic),
                100.0,
                "no backlinks reported",
            ));
        }
        let ratio = toxic.min(total) as f64 / total as f64;
        Some(MetricResult::measured(
            TOXIC_BACKLINKS,
            MetricValue::ratio(ratio),
            linear(ratio, 0.0, 0.2),
            format!("{toxic} of {total} backlinks flagged toxic"),
        ))
    })
}

fn with_signals(
    ctx: &EvalContext<'_>,
    id: MetricId,
    eval: impl Fn(&AuthoritySignals) -> Option<MetricResult>,
) -> MetricResult {
    let outcome = &ctx.providers.authority;
    match outcome.signals() {
        Some(signals) => eval(signals)
            .unwrap_or_else(|| MetricResult::unavailable(id, "not reported by the authority provider")),
        None => MetricResult::unavailable(id, outcome.reason().unwrap_or("authority data unavailable")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::context::testing::target;
    use crate::model::site::SiteFacts;
    use crate::providers::{ProviderFacts, ProviderOutcome};

    fn facts(signals: AuthoritySignals) -> ProviderFacts {
        ProviderFacts {
            authority: ProviderOutcome::Available { signals },
            ..ProviderFacts::default()
        }
    }

    #[test]
    fn test_scores_from_signals() {
        let target = target("https://example.com/");
        let site = SiteFacts::default();
        let providers = facts(AuthoritySignals {
            domain_authority: Some(42.0),
            referring_domains: Some(99),
            backlinks: Some(1000),
            toxic_backlinks: Some(100),
        });
        let ctx = EvalContext::new(&target, &[], &site, &providers);
        assert_eq!(domain_authority(&ctx).subscore(), Some(42.0));
        assert_eq!(referring_domains(&ctx).subscore(), Some(50.0));
        assert_eq!(toxic_backlinks(&ctx).subscore(), Some(50.0));
    }

    #[test]
    fn test_missing_fields_and_provider() {
        let target = target("https://example.com/");
        let site = SiteFacts::default();
        let providers = facts(AuthoritySignals {
            domain_authority: Some(10.0),
            ..AuthoritySignals::default()
        });
        let ctx = EvalContext::new(&target, &[], &site, &providers);
        assert!(domain_authority(&ctx).is_available());
        assert!(!referring_domains(&ctx).is_available());
        assert!(!toxic_backlinks(&ctx).is_available());

        let providers = ProviderFacts {
            authority: ProviderOutcome::unavailable("authority API not configured"),
            ..ProviderFacts::default()
        };
        let ctx = EvalContext::new(&target, &[], &site, &providers);
        assert_eq!(domain_authority(&ctx).detail(), "authority API not configured");
    }
}
