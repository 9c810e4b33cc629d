use std::net::IpAddr;

use ipnet::IpNet;

/// Outcome of an allow/deny subnet mutation or check (§6 "AccessFilter").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessVerdict {
    Allowed,
    Denied,
}

/// The ALLOW/DENY subnet table consulted both for incoming NTP client
/// traffic and, under its own namespace, for the C/M socket itself (§4.3
/// "Authorization layering", §6 "AccessFilter").
///
/// `ALLOW`/`DENY` commands operate on one namespace's table; `CMDALLOW`/
/// `CMDDENY` operate on the other. Both are the same shape, so a single
/// `AccessFilter` instance is parameterized by namespace at the call site
/// rather than duplicated.
pub trait AccessFilter {
    fn allow(&mut self, namespace: Namespace, net: IpNet);
    fn deny(&mut self, namespace: Namespace, net: IpNet);

    /// Like `allow`, but also prunes every existing entry `net` contains —
    /// `ALLOWALL`/`CMDALLOWALL` apply to a whole subnet tree, not just the
    /// exact prefix given (§3 "Data model").
    fn allow_all(&mut self, namespace: Namespace, net: IpNet);

    /// Like `deny`, but also prunes every existing entry `net` contains.
    fn deny_all(&mut self, namespace: Namespace, net: IpNet);

    fn check(&self, namespace: Namespace, addr: IpAddr) -> AccessVerdict;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Ntp,
    Cmdmon,
}

/// §3 "Data model": the CIDR trie maps a subnet to one of four states. Plain
/// `Allow`/`Deny` are overridden by a more specific rule; `AllowAll`/
/// `DenyAll` additionally claim the whole subtree beneath them at insertion
/// time, so a later, narrower rule can still carve out an exception but an
/// earlier, narrower rule cannot survive underneath one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Allow,
    Deny,
    AllowAll,
    DenyAll,
}

struct Entry {
    net: IpNet,
    rule: Rule,
}

/// Longest-prefix-match access table: the most specific matching subnet
/// wins, and among equally specific subnets the most recently added rule
/// wins (§4.3 "Authorization layering").
#[derive(Default)]
pub struct AccessTable {
    ntp: Vec<Entry>,
    cmdmon: Vec<Entry>,
}

impl AccessTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn table_mut(&mut self, namespace: Namespace) -> &mut Vec<Entry> {
        match namespace {
            Namespace::Ntp => &mut self.ntp,
            Namespace::Cmdmon => &mut self.cmdmon,
        }
    }

    fn table(&self, namespace: Namespace) -> &Vec<Entry> {
        match namespace {
            Namespace::Ntp => &self.ntp,
            Namespace::Cmdmon => &self.cmdmon,
        }
    }

    fn insert(&mut self, namespace: Namespace, net: IpNet, rule: Rule, cascade: bool) {
        let table = self.table_mut(namespace);
        table.retain(|e| e.net != net && !(cascade && net.contains(&e.net)));
        table.push(Entry { net, rule });
    }
}

impl AccessFilter for AccessTable {
    fn allow(&mut self, namespace: Namespace, net: IpNet) {
        self.insert(namespace, net, Rule::Allow, false);
    }

    fn deny(&mut self, namespace: Namespace, net: IpNet) {
        self.insert(namespace, net, Rule::Deny, false);
    }

    fn allow_all(&mut self, namespace: Namespace, net: IpNet) {
        self.insert(namespace, net, Rule::AllowAll, true);
    }

    fn deny_all(&mut self, namespace: Namespace, net: IpNet) {
        self.insert(namespace, net, Rule::DenyAll, true);
    }

    fn check(&self, namespace: Namespace, addr: IpAddr) -> AccessVerdict {
        let table = self.table(namespace);

        let best = table
            .iter()
            .filter(|e| e.net.contains(&addr))
            .max_by_key(|e| e.net.prefix_len());

        match best {
            Some(entry) if matches!(entry.rule, Rule::Allow | Rule::AllowAll) => {
                AccessVerdict::Allowed
            }
            Some(_) => AccessVerdict::Denied,
            // Default-deny: an address matching no rule at all is rejected,
            // matching the C/M socket's closed-by-default posture (§4.3).
            None => AccessVerdict::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_specific_subnet_wins() {
        let mut table = AccessTable::new();
        table.deny(Namespace::Ntp, "10.0.0.0/8".parse().unwrap());
        table.allow(Namespace::Ntp, "10.0.0.0/24".parse().unwrap());

        assert_eq!(
            table.check(Namespace::Ntp, "10.0.0.5".parse().unwrap()),
            AccessVerdict::Allowed
        );
        assert_eq!(
            table.check(Namespace::Ntp, "10.0.1.5".parse().unwrap()),
            AccessVerdict::Denied
        );
    }

    #[test]
    fn unmatched_address_defaults_to_denied() {
        let table = AccessTable::new();
        assert_eq!(
            table.check(Namespace::Cmdmon, "192.0.2.1".parse().unwrap()),
            AccessVerdict::Denied
        );
    }

    #[test]
    fn namespaces_are_independent() {
        let mut table = AccessTable::new();
        table.allow(Namespace::Ntp, "192.0.2.0/24".parse().unwrap());

        assert_eq!(
            table.check(Namespace::Ntp, "192.0.2.1".parse().unwrap()),
            AccessVerdict::Allowed
        );
        assert_eq!(
            table.check(Namespace::Cmdmon, "192.0.2.1".parse().unwrap()),
            AccessVerdict::Denied
        );
    }

    #[test]
    fn deny_all_prunes_a_narrower_allow_beneath_it() {
        let mut table = AccessTable::new();
        table.allow(Namespace::Ntp, "10.0.0.0/24".parse().unwrap());
        table.deny_all(Namespace::Ntp, "10.0.0.0/16".parse().unwrap());

        // The /24 allow was pruned; nothing narrower survives under the
        // /16 DENYALL, so the whole range is denied.
        assert_eq!(
            table.check(Namespace::Ntp, "10.0.0.5".parse().unwrap()),
            AccessVerdict::Denied
        );
    }

    #[test]
    fn allow_all_is_distinguishable_from_allow() {
        let mut table = AccessTable::new();
        table.allow(Namespace::Ntp, "10.0.0.0/24".parse().unwrap());
        table.allow_all(Namespace::Ntp, "10.0.0.0/16".parse().unwrap());

        // ALLOWALL at /16 prunes the narrower /24 ALLOW, but a later,
        // narrower DENY can still carve an exception out of it.
        assert_eq!(
            table.check(Namespace::Ntp, "10.0.0.5".parse().unwrap()),
            AccessVerdict::Allowed
        );

        table.deny(Namespace::Ntp, "10.0.0.0/24".parse().unwrap());
        assert_eq!(
            table.check(Namespace::Ntp, "10.0.0.5".parse().unwrap()),
            AccessVerdict::Denied
        );
        assert_eq!(
            table.check(Namespace::Ntp, "10.0.1.5".parse().unwrap()),
            AccessVerdict::Allowed
        );
    }
}
