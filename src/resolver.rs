//! Mail server resolution via DNS MX lookup
//!
//! Maps a recipient address to the hostname of its domain's mail exchange.
//! Results are memoized per domain for the lifetime of the resolver, so
//! repeated resolutions of the same domain issue a single DNS query.

use std::collections::HashMap;
use std::sync::Mutex;

use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::Resolver;
use log::debug;

use crate::Error;

/// The DNS side of mail server resolution
///
/// Kept as a trait so tests can swap in a scripted resolver; production code
/// uses [`SystemDns`].
pub trait MxResolve {
    /// Returns the MX exchange hostnames for `domain`, in the order the
    /// resolver returned them
    ///
    /// An empty list means the query succeeded but the domain has no MX
    /// records.
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, Error>;
}

/// MX lookups against the system-configured DNS resolver
pub struct SystemDns {
    resolver: Resolver,
}

impl SystemDns {
    /// Creates a resolver from the system configuration
    /// (`/etc/resolv.conf` on Unix)
    pub fn new() -> Result<SystemDns, Error> {
        Ok(SystemDns {
            resolver: Resolver::from_system_conf()?,
        })
    }
}

impl MxResolve for SystemDns {
    fn mx_records(&self, domain: &str) -> Result<Vec<String>, Error> {
        match self.resolver.mx_lookup(domain) {
            Ok(lookup) => Ok(lookup.iter().map(|mx| mx.exchange().to_utf8()).collect()),
            Err(err) if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) => {
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Resolves recipient addresses to deliverable mail exchange hostnames,
/// memoizing one hostname per domain
pub struct MailServerResolver<R = SystemDns> {
    dns: R,
    cache: Mutex<HashMap<String, String>>,
}

impl MailServerResolver<SystemDns> {
    /// Creates a resolver backed by the system DNS configuration
    pub fn system() -> Result<Self, Error> {
        Ok(MailServerResolver::new(SystemDns::new()?))
    }
}

impl<R: MxResolve> MailServerResolver<R> {
    /// Creates a resolver over the given DNS backend with an empty cache
    pub fn new(dns: R) -> Self {
        MailServerResolver {
            dns,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the mail exchange hostname for the domain of `address`
    ///
    /// The domain is everything after the last `@` (the whole input when it
    /// contains none). When the domain publishes several MX records, the
    /// first one returned by the resolver wins; this tool does not order by
    /// preference value. Any trailing root-zone dot is stripped.
    pub fn mail_server_for(&self, address: &str) -> Result<String, Error> {
        let domain = address.rsplit_once('@').map_or(address, |(_, d)| d);

        if let Some(host) = self.cache.lock().unwrap().get(domain) {
            debug!("mail server for {domain} cached: {host}");
            return Ok(host.clone());
        }

        let records = self.dns.mx_records(domain)?;
        let first = records
            .into_iter()
            .next()
            .ok_or_else(|| Error::NoMailServer(domain.to_owned()))?;
        let host = first.strip_suffix('.').unwrap_or(&first).to_owned();
        debug!("mail server for {domain} resolved: {host}");

        self.cache
            .lock()
            .unwrap()
            .insert(domain.to_owned(), host.clone());
        Ok(host)
    }
}

#[cfg(test)]
mod test {
    use std::cell::{Cell, RefCell};

    use pretty_assertions::assert_eq;

    use super::*;

    struct ScriptedDns {
        records: Vec<(&'static str, Vec<&'static str>)>,
        queries: Cell<usize>,
        queried: RefCell<Vec<String>>,
    }

    impl ScriptedDns {
        fn new(records: Vec<(&'static str, Vec<&'static str>)>) -> Self {
            ScriptedDns {
                records,
                queries: Cell::new(0),
                queried: RefCell::new(Vec::new()),
            }
        }
    }

    impl MxResolve for ScriptedDns {
        fn mx_records(&self, domain: &str) -> Result<Vec<String>, Error> {
            self.queries.set(self.queries.get() + 1);
            self.queried.borrow_mut().push(domain.to_owned());
            Ok(self
                .records
                .iter()
                .find(|(d, _)| *d == domain)
                .map(|(_, hosts)| hosts.iter().map(|h| h.to_string()).collect())
                .unwrap_or_default())
        }
    }

    #[test]
    fn resolves_first_record_and_strips_root_dot() {
        let resolver = MailServerResolver::new(ScriptedDns::new(vec![(
            "x.com",
            vec!["mx1.x.com.", "mx2.x.com."],
        )]));
        assert_eq!(resolver.mail_server_for("a@x.com").unwrap(), "mx1.x.com");
    }

    #[test]
    fn domain_is_everything_after_the_last_at() {
        let resolver =
            MailServerResolver::new(ScriptedDns::new(vec![("x.com", vec!["mx.x.com."])]));
        assert_eq!(
            resolver.mail_server_for("weird@user@x.com").unwrap(),
            "mx.x.com"
        );
    }

    #[test]
    fn memoizes_one_query_per_domain() {
        let resolver =
            MailServerResolver::new(ScriptedDns::new(vec![("x.com", vec!["mx.x.com."])]));
        assert_eq!(resolver.mail_server_for("a@x.com").unwrap(), "mx.x.com");
        assert_eq!(resolver.mail_server_for("b@x.com").unwrap(), "mx.x.com");
        assert_eq!(resolver.dns.queries.get(), 1);
        assert_eq!(*resolver.dns.queried.borrow(), vec!["x.com".to_owned()]);
    }

    #[test]
    fn no_records_is_an_error() {
        let resolver = MailServerResolver::new(ScriptedDns::new(vec![]));
        let err = resolver.mail_server_for("a@empty.test").unwrap_err();
        assert!(matches!(err, Error::NoMailServer(domain) if domain == "empty.test"));
    }
}
