//! Network interface control
//!
//! The tracker never touches interfaces itself. Hosts that drive a capture
//! device use [`InterfaceControl`] to bring it up, toggle promiscuous mode,
//! or change its address and MTU. [`IpLinkControl`] implements it on Linux
//! with sysfs for reads and the `ip` command for writes.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::InterfaceError;
use crate::types::{bit_set, MacAddr};

bit_set! {
    /// Kernel interface flags (IFF_*)
    InterfaceFlags {
        UP = 0x1,
        BROADCAST = 0x2,
        DEBUG = 0x4,
        LOOPBACK = 0x8,
        POINTOPOINT = 0x10,
        RUNNING = 0x40,
        NOARP = 0x80,
        PROMISC = 0x100,
        ALLMULTI = 0x200,
        MULTICAST = 0x1000,
    }
}

impl InterfaceFlags {
    pub fn is_up(&self) -> bool {
        self.contains(Self::UP)
    }

    pub fn is_promisc(&self) -> bool {
        self.contains(Self::PROMISC)
    }

    pub fn remove(&mut self, other: InterfaceFlags) {
        *self = Self::from_bits(self.bits() & !other.bits());
    }
}

/// Interface operations a capture host needs. Every failure carries the
/// device and a message and is safe to ignore.
pub trait InterfaceControl {
    fn flags(&self, device: &str) -> Result<InterfaceFlags, InterfaceError>;

    /// Make the interface's settable flags match `flags`
    fn set_flags(&self, device: &str, flags: InterfaceFlags) -> Result<(), InterfaceError>;

    fn hw_addr(&self, device: &str) -> Result<MacAddr, InterfaceError>;

    fn set_hw_addr(&self, device: &str, mac: MacAddr) -> Result<(), InterfaceError>;

    fn set_mtu(&self, device: &str, mtu: u32) -> Result<(), InterfaceError>;

    /// Add `flags` to whatever is currently set; returns the new flags
    fn delta_flags(
        &self,
        device: &str,
        flags: InterfaceFlags,
    ) -> Result<InterfaceFlags, InterfaceError> {
        let current = self.flags(device)?;
        let wanted = current.union(flags);
        if wanted != current {
            self.set_flags(device, wanted)?;
        }
        Ok(wanted)
    }

    fn set_up(&self, device: &str, up: bool) -> Result<(), InterfaceError> {
        let mut flags = self.flags(device)?;
        if up {
            flags.insert(InterfaceFlags::UP);
        } else {
            flags.remove(InterfaceFlags::UP);
        }
        self.set_flags(device, flags)
    }
}

/// `ip link` / sysfs backed control
#[derive(Debug, Clone)]
pub struct IpLinkControl {
    sysfs_root: PathBuf,
}

impl Default for IpLinkControl {
    fn default() -> Self {
        Self::new()
    }
}

impl IpLinkControl {
    pub fn new() -> Self {
        Self::with_sysfs_root("/sys/class/net")
    }

    /// Read attributes from somewhere other than `/sys/class/net`
    pub fn with_sysfs_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            sysfs_root: root.as_ref().to_path_buf(),
        }
    }

    fn read_attr(&self, device: &str, attr: &str) -> Result<String, InterfaceError> {
        let path = self.sysfs_root.join(device).join(attr);
        std::fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|e| InterfaceError::new(device, format!("reading {}: {}", path.display(), e)))
    }

    fn run_ip(device: &str, args: &[String]) -> Result<(), InterfaceError> {
        debug!("ip link set dev {} {}", device, args.join(" "));

        let output = Command::new("ip")
            .args(["link", "set", "dev", device])
            .args(args)
            .output()
            .map_err(|e| InterfaceError::new(device, format!("failed to run ip: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InterfaceError::new(device, stderr.trim().to_string()));
        }
        Ok(())
    }
}

impl InterfaceControl for IpLinkControl {
    fn flags(&self, device: &str) -> Result<InterfaceFlags, InterfaceError> {
        let raw = self.read_attr(device, "flags")?;
        parse_flags(&raw)
            .ok_or_else(|| InterfaceError::new(device, format!("unparseable flags '{}'", raw)))
    }

    fn set_flags(&self, device: &str, flags: InterfaceFlags) -> Result<(), InterfaceError> {
        Self::run_ip(device, &link_args(flags))
    }

    fn hw_addr(&self, device: &str) -> Result<MacAddr, InterfaceError> {
        let raw = self.read_attr(device, "address")?;
        raw.parse()
            .map_err(|_| InterfaceError::new(device, format!("unparseable address '{}'", raw)))
    }

    fn set_hw_addr(&self, device: &str, mac: MacAddr) -> Result<(), InterfaceError> {
        Self::run_ip(device, &["address".to_string(), mac.to_string()])
    }

    fn set_mtu(&self, device: &str, mtu: u32) -> Result<(), InterfaceError> {
        if mtu == 0 {
            return Err(InterfaceError::new(device, "MTU must be non-zero"));
        }
        Self::run_ip(device, &["mtu".to_string(), mtu.to_string()])
    }
}

/// Parse the sysfs `flags` attribute (`0x1003`)
pub fn parse_flags(raw: &str) -> Option<InterfaceFlags> {
    let raw = raw.trim();
    let hex = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(hex, 16).ok().map(InterfaceFlags::from_bits)
}

/// `ip link set` arguments that apply the settable bits of `flags`
pub fn link_args(flags: InterfaceFlags) -> Vec<String> {
    let on_off = |set: bool| if set { "on" } else { "off" };

    let mut args = vec![if flags.is_up() { "up" } else { "down" }.to_string()];
    args.push("promisc".to_string());
    args.push(on_off(flags.is_promisc()).to_string());
    args.push("allmulticast".to_string());
    args.push(on_off(flags.contains(InterfaceFlags::ALLMULTI)).to_string());
    args.push("multicast".to_string());
    args.push(on_off(flags.contains(InterfaceFlags::MULTICAST)).to_string());
    args.push("arp".to_string());
    args.push(on_off(!flags.contains(InterfaceFlags::NOARP)).to_string());
    args
}
