//! Contact classification, lead scoring and selection of the one row a
//! prospect is reported with.

use crate::core::config::{Config, DomainOnlyPolicy};
use crate::core::models::{
    DeliverabilityStatus, EmailSource, ExtractedContact, LeadKind, LeadRecord, ResolvedSite,
};
use crate::utils::domain::email_domain;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Consumer mailbox providers. An address here is rarely the company's own inbox.
const FREE_MAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "aol.com",
    "icloud.com",
    "gmx.com",
    "proton.me",
    "protonmail.com",
];

/// True when the local-part (ignoring any `+tag`) is a function mailbox
/// such as `info@` or `sales+eu@`.
pub fn is_role_email(address: &str, role_prefixes: &HashSet<String>) -> bool {
    let local = address
        .split('@')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    let base = local.split('+').next().unwrap_or_default();
    role_prefixes.contains(base)
}

/// Lexicographic ranking of a candidate lead. Field order is tier order, so the
/// derived `Ord` lets no lower tier overturn a higher one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScoreKey {
    pub named: bool,
    /// 0 when no email was selected, otherwise 1 (raw) to 4 (json_ld).
    pub trust: u8,
    pub deliverability: u8,
    pub has_phone: bool,
}

impl ScoreKey {
    pub fn new(
        email: Option<(bool, EmailSource)>,
        deliverability: DeliverabilityStatus,
        has_phone: bool,
    ) -> Self {
        Self {
            named: email.map(|(named, _)| named).unwrap_or(false),
            trust: email.map(|(_, source)| source.trust_rank()).unwrap_or(0),
            deliverability: deliverability.rank(),
            has_phone,
        }
    }

    /// Scalar form of the key for the output column. Each tier's weight
    /// exceeds the largest sum of every tier below it.
    pub fn score(&self) -> u32 {
        u32::from(self.named) * 1000
            + u32::from(self.trust) * 100
            + u32::from(self.deliverability) * 10
            + u32::from(self.has_phone)
    }
}

/// How closely an address belongs to the prospect's site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum DomainAffinity {
    FreeMail,
    Other,
    Own,
}

fn domain_affinity(address: &str, site_domain: Option<&str>) -> DomainAffinity {
    let Some(domain) = email_domain(address) else {
        return DomainAffinity::Other;
    };
    let own = site_domain.is_some_and(|site| {
        domain == site
            || domain
                .strip_suffix(site)
                .is_some_and(|rest| rest.ends_with('.'))
    });
    if own {
        DomainAffinity::Own
    } else if FREE_MAIL_DOMAINS.contains(&domain) {
        DomainAffinity::FreeMail
    } else {
        DomainAffinity::Other
    }
}

struct Candidate<'a> {
    address: &'a str,
    source: EmailSource,
    named: bool,
    affinity: DomainAffinity,
}

fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.named
        .cmp(&a.named)
        .then_with(|| b.source.cmp(&a.source))
        .then_with(|| b.affinity.cmp(&a.affinity))
        .then_with(|| a.address.cmp(b.address))
}

/// Picks the best email of `extracted`: named before role, then by discovery
/// trust, then addresses on `site_domain` (free webmail last), then
/// alphabetically.
pub fn select_email<'a>(
    extracted: &'a ExtractedContact,
    role_prefixes: &HashSet<String>,
    site_domain: Option<&str>,
) -> Option<(&'a str, EmailSource, bool)> {
    extracted
        .emails
        .iter()
        .map(|(address, source)| Candidate {
            address: address.as_str(),
            source: *source,
            named: !is_role_email(address, role_prefixes),
            affinity: domain_affinity(address, site_domain),
        })
        .min_by(compare_candidates)
        .map(|c| (c.address, c.source, c.named))
}

/// Builds the lead row for one prospect, or `None` when nothing actionable
/// was found.
pub fn score_and_select(
    company_name: &str,
    extracted: &ExtractedContact,
    deliverability: DeliverabilityStatus,
    resolved: &ResolvedSite,
    config: &Config,
) -> Option<LeadRecord> {
    let selected = select_email(extracted, &config.role_email_prefixes, resolved.domain());
    let phones: Vec<&str> = extracted
        .phones
        .iter()
        .take(config.max_phones)
        .map(String::as_str)
        .collect();
    let has_phone = !phones.is_empty();

    let kind = match selected {
        Some((_, _, true)) => LeadKind::NamedEmail,
        Some((_, _, false)) => LeadKind::RoleEmail,
        None if has_phone => LeadKind::PhoneOnly,
        None => {
            if !resolved.is_resolved() {
                return None;
            }
            let emit = match config.domain_only_policy {
                DomainOnlyPolicy::Always => true,
                DomainOnlyPolicy::Never => false,
                DomainOnlyPolicy::KnownDeliverability => {
                    deliverability != DeliverabilityStatus::Unknown
                }
            };
            if !emit {
                return None;
            }
            LeadKind::DomainOnly
        }
    };

    let key = ScoreKey::new(
        selected.map(|(_, source, named)| (named, source)),
        deliverability,
        has_phone,
    );
    let final_url = resolved.final_url().map(|u| u.to_string());

    Some(LeadRecord {
        company_name: company_name.to_string(),
        final_url: final_url.clone(),
        domain: resolved.domain().map(str::to_string),
        email: selected.map(|(address, _, _)| address.to_string()),
        email_source: selected.map(|(_, source, _)| source),
        phone: has_phone.then(|| phones.join(";")),
        source_url: final_url,
        verification_status: deliverability,
        score: key.score(),
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use url::Url;

    fn resolved(url: &str) -> ResolvedSite {
        let final_url = Url::parse(url).unwrap();
        let domain = final_url.host_str().unwrap().trim_start_matches("www.").to_string();
        ResolvedSite::Resolved { final_url, domain }
    }

    fn contacts(emails: &[(&str, EmailSource)], phones: &[&str]) -> ExtractedContact {
        let mut c = ExtractedContact::default();
        for (address, source) in emails {
            c.add_email(address, *source);
        }
        for phone in phones {
            c.add_phone(phone.to_string());
        }
        c
    }

    const ALL_SOURCES: [EmailSource; 4] = [
        EmailSource::Raw,
        EmailSource::Mailto,
        EmailSource::Deobfuscated,
        EmailSource::JsonLd,
    ];
    const ALL_STATUSES: [DeliverabilityStatus; 3] = [
        DeliverabilityStatus::MxPresent,
        DeliverabilityStatus::Unknown,
        DeliverabilityStatus::NoMx,
    ];

    #[test]
    fn test_role_classification() {
        let config = Config::default();
        let roles = &config.role_email_prefixes;
        assert!(is_role_email("info@acme.test", roles));
        assert!(is_role_email("Sales+EU@acme.test", roles));
        assert!(is_role_email("no-reply@acme.test", roles));
        assert!(!is_role_email("jane.doe@acme.test", roles));
        assert!(!is_role_email("information@acme.test", roles));
    }

    #[test]
    fn test_named_json_ld_always_beats_role() {
        for a_status in ALL_STATUSES {
            for b_status in ALL_STATUSES {
                for b_source in ALL_SOURCES {
                    for (a_phone, b_phone) in [(false, true), (true, false), (false, false)] {
                        let a = ScoreKey::new(Some((true, EmailSource::JsonLd)), a_status, a_phone);
                        let b = ScoreKey::new(Some((false, b_source)), b_status, b_phone);
                        assert!(a > b);
                        assert!(a.score() > b.score());
                    }
                }
            }
        }
    }

    #[test]
    fn test_score_agrees_with_key_order() {
        let mut keys = Vec::new();
        for named in [false, true] {
            for source in ALL_SOURCES {
                for status in ALL_STATUSES {
                    for phone in [false, true] {
                        keys.push(ScoreKey::new(Some((named, source)), status, phone));
                    }
                }
            }
        }
        for status in ALL_STATUSES {
            for phone in [false, true] {
                keys.push(ScoreKey::new(None, status, phone));
            }
        }
        for a in &keys {
            for b in &keys {
                assert_eq!(a.cmp(b), a.score().cmp(&b.score()), "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_selects_named_over_role_then_trust_then_alpha() {
        let config = Config::default();
        let c = contacts(
            &[
                ("sales@acme.test", EmailSource::JsonLd),
                ("zoe@acme.test", EmailSource::Mailto),
                ("adam@acme.test", EmailSource::Raw),
                ("bob@acme.test", EmailSource::Mailto),
            ],
            &[],
        );
        let (address, source, named) =
            select_email(&c, &config.role_email_prefixes, Some("acme.test")).unwrap();
        assert_eq!(address, "bob@acme.test");
        assert_eq!(source, EmailSource::Mailto);
        assert!(named);
    }

    #[test]
    fn test_own_domain_beats_footer_credit() {
        let config = Config::default();
        let c = contacts(
            &[
                ("dan@webagency.test", EmailSource::Raw),
                ("jane@acme.test", EmailSource::Raw),
            ],
            &[],
        );
        let selected = select_email(&c, &config.role_email_prefixes, Some("acme.test"));
        assert_eq!(selected, Some(("jane@acme.test", EmailSource::Raw, true)));

        // no site domain: plain alphabetical
        let selected = select_email(&c, &config.role_email_prefixes, None);
        assert_eq!(selected, Some(("dan@webagency.test", EmailSource::Raw, true)));
    }

    #[test]
    fn test_domain_affinity_never_overrides_trust_or_named() {
        let config = Config::default();
        let c = contacts(
            &[
                ("jane@acme.test", EmailSource::Raw),
                ("dan@webagency.test", EmailSource::Mailto),
                ("info@acme.test", EmailSource::JsonLd),
            ],
            &[],
        );
        let selected = select_email(&c, &config.role_email_prefixes, Some("acme.test"));
        assert_eq!(selected, Some(("dan@webagency.test", EmailSource::Mailto, true)));
    }

    #[test]
    fn test_free_mail_ranked_last_among_equals() {
        let config = Config::default();
        let c = contacts(
            &[
                ("aaron@gmail.com", EmailSource::Raw),
                ("zed@partner.test", EmailSource::Raw),
                ("ops@mail.acme.test", EmailSource::Raw),
            ],
            &[],
        );
        let selected = select_email(&c, &config.role_email_prefixes, Some("acme.test"));
        assert_eq!(selected, Some(("ops@mail.acme.test", EmailSource::Raw, true)));

        let selected = select_email(&c, &config.role_email_prefixes, Some("other.test"));
        assert_eq!(selected, Some(("zed@partner.test", EmailSource::Raw, true)));
    }

    #[test]
    fn test_named_raw_row() {
        let config = Config::default();
        let c = contacts(
            &[
                ("sales@acme.test", EmailSource::Mailto),
                ("jane.doe@acme.test", EmailSource::Raw),
            ],
            &["+15125550142"],
        );
        let lead = score_and_select(
            "Acme",
            &c,
            DeliverabilityStatus::MxPresent,
            &resolved("http://acme.test/contact"),
            &config,
        )
        .unwrap();

        assert_eq!(lead.email.as_deref(), Some("jane.doe@acme.test"));
        assert_eq!(lead.email_source, Some(EmailSource::Raw));
        assert_eq!(lead.verification_status, DeliverabilityStatus::MxPresent);
        assert_eq!(lead.kind, LeadKind::NamedEmail);
        assert_eq!(lead.phone.as_deref(), Some("+15125550142"));
        assert_eq!(lead.domain.as_deref(), Some("acme.test"));
        assert_eq!(lead.source_url.as_deref(), Some("http://acme.test/contact"));
        assert_eq!(lead.score, 1000 + 100 + 20 + 1);
    }

    #[test]
    fn test_phone_only_row_joins_phones() {
        let config = Config {
            max_phones: 2,
            ..Config::default()
        };
        let c = contacts(&[], &["+15125550142", "+15125550100", "+15125550199"]);
        let lead = score_and_select(
            "Acme",
            &c,
            DeliverabilityStatus::Unknown,
            &resolved("http://acme.test/"),
            &config,
        )
        .unwrap();
        assert_eq!(lead.kind, LeadKind::PhoneOnly);
        assert_eq!(lead.email, None);
        assert_eq!(lead.phone.as_deref(), Some("+15125550100;+15125550142"));
        assert_eq!(lead.score, 10 + 1);
    }

    #[test]
    fn test_domain_only_policy() {
        let empty = ExtractedContact::default();
        let site = resolved("https://www.parked.test/");
        let default_config = Config::default();

        let lead = score_and_select(
            "Parked",
            &empty,
            DeliverabilityStatus::NoMx,
            &site,
            &default_config,
        )
        .unwrap();
        assert_eq!(lead.kind, LeadKind::DomainOnly);
        assert_eq!(lead.verification_status, DeliverabilityStatus::NoMx);
        assert_eq!(lead.email, None);
        assert_eq!(lead.phone, None);
        assert_eq!(lead.domain.as_deref(), Some("parked.test"));
        assert_eq!(lead.score, 0);

        assert!(score_and_select(
            "Parked",
            &empty,
            DeliverabilityStatus::Unknown,
            &site,
            &default_config
        )
        .is_none());

        let always = Config {
            domain_only_policy: DomainOnlyPolicy::Always,
            ..Config::default()
        };
        assert!(
            score_and_select("Parked", &empty, DeliverabilityStatus::Unknown, &site, &always)
                .is_some()
        );

        let never = Config {
            domain_only_policy: DomainOnlyPolicy::Never,
            ..Config::default()
        };
        assert!(
            score_and_select("Parked", &empty, DeliverabilityStatus::MxPresent, &site, &never)
                .is_none()
        );
    }

    #[test]
    fn test_nothing_when_unresolved_and_empty() {
        let config = Config {
            domain_only_policy: DomainOnlyPolicy::Always,
            ..Config::default()
        };
        let failed = ResolvedSite::Failed(ErrorKind::Unreachable);
        assert!(score_and_select(
            "Ghost",
            &ExtractedContact::default(),
            DeliverabilityStatus::Unknown,
            &failed,
            &config
        )
        .is_none());
    }
}
