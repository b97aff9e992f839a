//! Best-effort IP range inference

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::Serialize;

/// Where an IP observation was pulled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IpOrigin {
    Arp,
    Dhcp,
    Udp,
    Tcp,
}

/// IP details the decoder managed to lift out of an unencrypted data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpObservation {
    /// Address used by the sending station
    pub addr: Ipv4Addr,
    /// Subnet mask, only known from DHCP
    pub netmask: Option<Ipv4Addr>,
    /// Default gateway, only known from DHCP
    pub gateway: Option<Ipv4Addr>,
    pub origin: IpOrigin,
}

impl IpObservation {
    pub fn new(addr: Ipv4Addr, origin: IpOrigin) -> Self {
        Self {
            addr,
            netmask: None,
            gateway: None,
            origin,
        }
    }

    /// Addresses that can't describe a station's subnet
    fn is_meaningful(&self) -> bool {
        !(self.addr.is_unspecified() || self.addr.is_broadcast() || self.addr.is_multicast())
    }
}

/// Guessed address block and gateway. `None` means nothing seen yet; a /0
/// block is still a real guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IpGuess {
    pub block: Option<Ipv4Network>,
    pub gateway: Option<Ipv4Addr>,
}

impl IpGuess {
    pub fn is_unknown(&self) -> bool {
        self.block.is_none()
    }

    /// Network address of the guessed block
    pub fn addr_block(&self) -> Option<Ipv4Addr> {
        self.block.map(|b| b.network())
    }

    pub fn netmask(&self) -> Option<Ipv4Addr> {
        self.block.map(|b| b.mask())
    }

    pub fn prefix_len(&self) -> Option<u8> {
        self.block.map(|b| b.prefix())
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        self.block.map_or(false, |b| b.contains(addr))
    }

    /// Replace the guess with a single host observation (client side).
    pub fn observe_host(&mut self, obs: &IpObservation) -> bool {
        if !obs.is_meaningful() {
            return false;
        }
        if self.apply_dhcp(obs) {
            return true;
        }
        // Keep a DHCP-learned subnet while the host stays inside it
        if matches!(self.block, Some(b) if b.prefix() < 32 && b.contains(obs.addr)) {
            return true;
        }
        self.block = Some(Ipv4Network::from(obs.addr));
        true
    }

    /// Widen the guess so it covers `obs` (network side): the block becomes
    /// the longest common prefix of every address merged so far.
    pub fn merge(&mut self, obs: &IpObservation) -> bool {
        if !obs.is_meaningful() {
            return false;
        }
        if self.apply_dhcp(obs) {
            return true;
        }

        let widened = match self.block {
            None => Ipv4Network::from(obs.addr),
            Some(block) => (0..=block.prefix())
                .rev()
                .filter_map(|prefix| normalized(block.network(), prefix))
                .find(|candidate| candidate.contains(obs.addr))
                .unwrap_or(block),
        };
        self.block = Some(widened);
        true
    }

    fn apply_dhcp(&mut self, obs: &IpObservation) -> bool {
        if obs.origin != IpOrigin::Dhcp {
            return false;
        }
        let subnet = obs
            .netmask
            .filter(|mask| !mask.is_unspecified())
            .and_then(|mask| Ipv4Network::with_netmask(obs.addr, mask).ok())
            .and_then(|net| normalized(net.network(), net.prefix()));

        match subnet {
            Some(net) => {
                self.block = Some(net);
                if obs.gateway.is_some() {
                    self.gateway = obs.gateway;
                }
                true
            }
            None => false,
        }
    }
}

/// Block whose stored address is its network address
fn normalized(addr: Ipv4Addr, prefix: u8) -> Option<Ipv4Network> {
    let net = Ipv4Network::new(addr, prefix).ok()?;
    Ipv4Network::new(net.network(), prefix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(a: u8, b: u8, c: u8, d: u8) -> IpObservation {
        IpObservation::new(Ipv4Addr::new(a, b, c, d), IpOrigin::Arp)
    }

    #[test]
    fn test_merge_narrows_to_common_prefix() {
        let mut guess = IpGuess::default();
        assert!(guess.is_unknown());

        guess.merge(&obs(192, 168, 1, 10));
        assert_eq!(guess.prefix_len(), Some(32));

        guess.merge(&obs(192, 168, 1, 200));
        assert_eq!(guess.addr_block(), Some(Ipv4Addr::new(192, 168, 1, 0)));
        assert_eq!(guess.netmask(), Some(Ipv4Addr::new(255, 255, 255, 0)));

        guess.merge(&obs(192, 168, 1, 77));
        assert_eq!(guess.prefix_len(), Some(24));
    }

    #[test]
    fn test_disjoint_hosts_widen_to_default_route() {
        let mut guess = IpGuess::default();
        guess.merge(&obs(10, 0, 0, 1));
        guess.merge(&obs(192, 168, 0, 1));
        assert_eq!(guess.prefix_len(), Some(0));
        assert!(!guess.is_unknown());

        // A /0 guess keeps covering every host merged so far
        guess.merge(&obs(172, 16, 0, 1));
        assert_eq!(guess.prefix_len(), Some(0));
        assert!(guess.contains(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(guess.contains(Ipv4Addr::new(192, 168, 0, 1)));
    }

    #[test]
    fn test_dhcp_sets_mask_and_gateway() {
        let mut guess = IpGuess::default();
        let ack = IpObservation {
            addr: Ipv4Addr::new(10, 0, 5, 23),
            netmask: Some(Ipv4Addr::new(255, 255, 0, 0)),
            gateway: Some(Ipv4Addr::new(10, 0, 0, 1)),
            origin: IpOrigin::Dhcp,
        };
        guess.observe_host(&ack);
        assert_eq!(guess.addr_block(), Some(Ipv4Addr::new(10, 0, 0, 0)));
        assert_eq!(guess.gateway, Some(Ipv4Addr::new(10, 0, 0, 1)));

        // Host traffic inside the learned subnet keeps the subnet
        guess.observe_host(&obs(10, 0, 5, 23));
        assert_eq!(guess.prefix_len(), Some(16));

        guess.observe_host(&obs(172, 16, 0, 9));
        assert_eq!(guess.prefix_len(), Some(32));
    }

    #[test]
    fn test_non_contiguous_dhcp_mask_ignored() {
        let mut guess = IpGuess::default();
        let ack = IpObservation {
            addr: Ipv4Addr::new(10, 0, 5, 23),
            netmask: Some(Ipv4Addr::new(255, 0, 255, 0)),
            gateway: None,
            origin: IpOrigin::Dhcp,
        };
        guess.merge(&ack);
        assert_eq!(guess.prefix_len(), Some(32));
    }

    #[test]
    fn test_meaningless_addresses_ignored() {
        let mut guess = IpGuess::default();
        assert!(!guess.merge(&obs(0, 0, 0, 0)));
        assert!(!guess.merge(&obs(255, 255, 255, 255)));
        assert!(!guess.observe_host(&obs(239, 1, 1, 1)));
        assert!(guess.is_unknown());
    }
}
