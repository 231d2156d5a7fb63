use crate::election::NodeId;

// Payload kind bytes
pub const KIND_ELECTION_CALL: u8 = 0x01;
pub const KIND_ANNOUNCE: u8 = 0x02;

/// What nodes say to each other. One message per radio packet: a kind byte
/// followed by the sender's ID, big-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerMessage {
    /// Start a new round; everyone should announce
    ElectionCall { id: NodeId },
    /// The sender's ID, for the roster
    Announce { id: NodeId },
}

impl PeerMessage {
    pub fn to_bytes(self) -> Vec<u8> {
        let (kind, id) = match self {
            PeerMessage::ElectionCall { id } => (KIND_ELECTION_CALL, id),
            PeerMessage::Announce { id } => (KIND_ANNOUNCE, id),
        };
        let mut bytes = vec![kind];
        bytes.extend_from_slice(&id.to_be_bytes());
        bytes
    }

    pub fn parse(payload: &[u8]) -> Option<PeerMessage> {
        match *payload {
            [KIND_ELECTION_CALL, high, low] => Some(PeerMessage::ElectionCall {
                id: u16::from_be_bytes([high, low]),
            }),
            [KIND_ANNOUNCE, high, low] => Some(PeerMessage::Announce {
                id: u16::from_be_bytes([high, low]),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bytes() {
        assert_eq!(
            PeerMessage::ElectionCall { id: 0x0007 }.to_bytes(),
            vec![0x01, 0x00, 0x07]
        );
        assert_eq!(
            PeerMessage::Announce { id: 0x1234 }.to_bytes(),
            vec![0x02, 0x12, 0x34]
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            PeerMessage::parse(&[0x01, 0x00, 0x07]),
            Some(PeerMessage::ElectionCall { id: 7 })
        );
        assert_eq!(
            PeerMessage::parse(&[0x02, 0x12, 0x34]),
            Some(PeerMessage::Announce { id: 0x1234 })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(PeerMessage::parse(&[]), None);
        assert_eq!(PeerMessage::parse(&[0x02, 0x12]), None);
        assert_eq!(PeerMessage::parse(&[0x03, 0x00, 0x01]), None);
        assert_eq!(PeerMessage::parse(&[0x02, 0x12, 0x34, 0x00]), None);
    }
}
