use std::net::{IpAddr, Ipv4Addr};

use pnet::datalink::NetworkInterface;
use pnet::ipnetwork::IpNetwork;

use crate::mac::MacAddress;

/// Interface a wake packet leaves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRoute {
    pub interface: String,
    pub hw_addr: Option<MacAddress>,
    pub addr: Ipv4Addr,
}

/// Broadcast address of the first usable interface (optionally restricted
/// to the one named `only`), or the limited broadcast address if none fits.
pub fn local_broadcast(only: Option<&str>) -> IpAddr {
    let interfaces = pnet::datalink::interfaces();
    match pick_broadcast(&interfaces, only) {
        Some(route) => {
            match route.hw_addr {
                Some(hw) => log::info!("using interface '{}' ({}) for broadcast", route.interface, hw),
                None => log::info!("using interface '{}' for broadcast", route.interface),
            }
            IpAddr::V4(route.addr)
        }
        None => {
            log::warn!("no suitable interface for broadcast, falling back to {}", Ipv4Addr::BROADCAST);
            IpAddr::V4(Ipv4Addr::BROADCAST)
        }
    }
}

pub fn pick_broadcast(interfaces: &[NetworkInterface], only: Option<&str>) -> Option<BroadcastRoute> {
    interfaces
        .iter()
        .filter(|iface| only.map_or(true, |name| iface.name == name))
        .filter(|iface| !iface.is_loopback() && iface.is_up())
        .find_map(|iface| {
            iface.ips.iter().find_map(|net| match net {
                IpNetwork::V4(v4) => {
                    log::debug!("interface '{}' carries {}", iface.name, v4);
                    Some(BroadcastRoute {
                        interface: iface.name.clone(),
                        hw_addr: iface.mac.map(MacAddress::from),
                        addr: v4.broadcast(),
                    })
                }
                IpNetwork::V6(_) => None,
            })
        })
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use pnet::util::MacAddr;

    const IFF_UP: u32 = 0x1;
    const IFF_LOOPBACK: u32 = 0x8;

    fn iface(name: &str, flags: u32, ips: &[&str]) -> NetworkInterface {
        NetworkInterface {
            name: name.into(),
            description: String::new(),
            index: 0,
            mac: None,
            ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            flags,
        }
    }

    #[test]
    fn skips_loopback_down_and_v6_only() {
        let ifaces = vec![
            iface("lo", IFF_UP | IFF_LOOPBACK, &["127.0.0.1/8"]),
            iface("eth1", 0, &["10.1.0.4/16"]),
            iface("wg0", IFF_UP, &["fd00::2/64"]),
            iface("eth0", IFF_UP, &["fe80::1/64", "192.168.1.20/24"]),
        ];
        let route = pick_broadcast(&ifaces, None).unwrap();
        assert_eq!(route.interface, "eth0");
        assert_eq!(route.addr, Ipv4Addr::new(192, 168, 1, 255));
        assert_eq!(route.hw_addr, None);
    }

    #[test]
    fn honours_interface_name() {
        let ifaces = vec![
            iface("eth0", IFF_UP, &["192.168.1.20/24"]),
            iface("eth2", IFF_UP, &["10.20.0.7/16"]),
        ];
        let route = pick_broadcast(&ifaces, Some("eth2")).unwrap();
        assert_eq!(route.addr, Ipv4Addr::new(10, 20, 255, 255));
        assert_eq!(pick_broadcast(&ifaces, Some("eth9")), None);
    }

    #[test]
    fn reports_hardware_address() {
        let mut eth0 = iface("eth0", IFF_UP, &["192.168.1.20/24"]);
        eth0.mac = Some(MacAddr::new(0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e));

        let route = pick_broadcast(&[eth0], None).unwrap();
        assert_eq!(route.hw_addr.map(|m| m.to_string()).as_deref(), Some("00:1A:2B:3C:4D:5E"));
    }
}
