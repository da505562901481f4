use std::net::IpAddr;

use m6kproto_frame::Direction;
use tracing::{debug, info};

use crate::discovery::{has_magic, ICON_TAG, ICON_TAG_OFFSET};

/// Datagrams shorter than this never take part in identification.
pub const MIN_IDENTIFY_LEN: usize = 10;

/// Who the Icon and the Frame are, as far as the session knows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeerIdentity {
    pub icon: Option<IpAddr>,
    pub frame: Option<IpAddr>,
}

impl PeerIdentity {
    /// The Icon is known. Direction can be inferred from here on.
    pub fn is_identified(&self) -> bool {
        self.icon.is_some()
    }
}

/// What one observation did to the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Datagram too short or without the discovery magic. Nothing changed.
    Ignored,
    /// A `TCIcon` probe named a new Icon; any known Frame was forgotten.
    IconIdentified(IpAddr),
    /// First packet towards the Icon from another host.
    FrameIdentified(IpAddr),
    Unchanged,
}

/// Where a packet sits relative to the identified peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    IconToFrame,
    FrameToIcon,
    /// Icon talking to a broadcast address.
    IconBroadcast,
    /// No Icon known yet.
    Unidentified,
    /// Neither endpoint is the Icon.
    Unrelated,
}

impl Route {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Route::IconToFrame | Route::IconBroadcast => Some(Direction::IconToFrame),
            Route::FrameToIcon => Some(Direction::FrameToIcon),
            Route::Unidentified | Route::Unrelated => None,
        }
    }
}

/// Learns the Icon and Frame addresses from traffic.
///
/// The Icon announces itself with a discovery datagram carrying the
/// `TCIcon` tag. The Frame is whichever host first talks back to it.
#[derive(Debug, Clone, Default)]
pub struct PeerIdentifier {
    identity: PeerIdentity,
}

impl PeerIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with known addresses, e.g. from command-line flags.
    pub fn with_addresses(icon: Option<IpAddr>, frame: Option<IpAddr>) -> Self {
        Self {
            identity: PeerIdentity { icon, frame },
        }
    }

    pub fn identity(&self) -> PeerIdentity {
        self.identity
    }

    pub fn reset(&mut self) {
        self.identity = PeerIdentity::default();
    }

    /// Feed one UDP discovery datagram.
    pub fn observe_udp(&mut self, src: IpAddr, dst: IpAddr, payload: &[u8]) -> Observation {
        if payload.len() < MIN_IDENTIFY_LEN || !has_magic(payload) {
            return Observation::Ignored;
        }

        if !self.identity.is_identified()
            && payload[ICON_TAG_OFFSET..ICON_TAG_OFFSET + ICON_TAG.len()] == ICON_TAG[..]
        {
            info!(icon = %src, "icon identified");
            self.identity = PeerIdentity {
                icon: Some(src),
                frame: None,
            };
            return Observation::IconIdentified(src);
        }

        self.observe_packet(src, dst)
    }

    /// Feed any packet (UDP or TCP) between two hosts. Only learns the Frame.
    pub fn observe_packet(&mut self, src: IpAddr, dst: IpAddr) -> Observation {
        match self.identity {
            PeerIdentity {
                icon: Some(icon),
                frame: None,
            } if dst == icon && src != icon => {
                info!(frame = %src, "frame identified");
                self.identity.frame = Some(src);
                Observation::FrameIdentified(src)
            }
            _ => Observation::Unchanged,
        }
    }

    /// Place a packet relative to the known peers.
    pub fn classify(&self, src: IpAddr, dst: IpAddr) -> Route {
        let Some(icon) = self.identity.icon else {
            return Route::Unidentified;
        };

        let route = if src == icon {
            if self.identity.frame != Some(dst) && is_broadcast(dst) {
                Route::IconBroadcast
            } else {
                Route::IconToFrame
            }
        } else if dst == icon {
            Route::FrameToIcon
        } else {
            Route::Unrelated
        };
        debug!(%src, %dst, ?route, "packet classified");
        route
    }
}

fn is_broadcast(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_broadcast() || v4.octets()[3] == 0xFF,
        IpAddr::V6(v6) => v6.is_multicast(),
    }
}
