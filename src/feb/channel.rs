use super::{Opcode, OperandWidth};

/// Identifier of a channel inside a [`ChannelSet`]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ChannelId(usize);

/// Growable byte buffer receiving encoded instructions
#[derive(Debug, Default)]
struct Channel {
    bytes: Vec<u8>,
}

impl Channel {
    /// Minimum number of bytes by which a full channel grows
    const GROWTH_INCREMENT: usize = 64;

    /// Make sure `additional` more bytes fit without reallocating mid-write
    ///
    /// Capacity at least doubles, so appending is amortized constant time per byte.
    fn request_capacity(&mut self, additional: usize) {
        let required = self.bytes.len() + additional;
        let capacity = self.bytes.capacity();
        if required > capacity {
            let target = usize::max(capacity * 2, required + Self::GROWTH_INCREMENT);
            self.bytes.reserve_exact(target - self.bytes.len());
        }
    }

    fn write(&mut self, data: &[u8]) {
        self.request_capacity(data.len());
        self.bytes.extend_from_slice(data);
    }
}

/// Set of instruction channels, at most one of which is active
///
/// The primary channel of a unit stays alive for the whole unit while each function body gets a
/// transient channel of its own. Writes always go to the active channel; already-written bytes of
/// any live channel can be patched.
///
/// Misuse (writing with no active channel, touching a removed channel, patching past the end of
/// a channel) is a bug in the generator and panics.
#[derive(Debug, Default)]
pub struct ChannelSet {
    channels: Vec<Option<Channel>>,
    active: Option<ChannelId>,
}

impl ChannelSet {
    pub fn new() -> ChannelSet {
        ChannelSet::default()
    }

    /// Open a new empty channel (it does not become active)
    pub fn add_channel(&mut self) -> ChannelId {
        let id = ChannelId(self.channels.len());
        self.channels.push(Some(Channel::default()));
        log::trace!("Opened channel {:?}", id);
        id
    }

    /// Close a channel, returning everything that was written to it
    pub fn remove_channel(&mut self, id: ChannelId) -> Vec<u8> {
        let channel = self
            .channels
            .get_mut(id.0)
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("channel {:?} is not open", id));
        if self.active == Some(id) {
            self.active = None;
        }
        log::trace!("Closed channel {:?} ({} bytes)", id, channel.bytes.len());
        channel.bytes
    }

    /// Direct subsequent writes to a channel
    pub fn set_active(&mut self, id: ChannelId) {
        let _ = self.channel(id);
        self.active = Some(id);
    }

    /// Channel currently receiving writes
    pub fn active(&self) -> Option<ChannelId> {
        self.active
    }

    /// Number of live channels
    pub fn open_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.is_some()).count()
    }

    /// Drop every live channel along with whatever was written to it
    pub fn clear(&mut self) {
        let dropped = self.open_channels();
        if dropped > 0 {
            log::debug!("Dropping {} unfinished channel(s)", dropped);
        }
        self.channels.clear();
        self.active = None;
    }

    fn channel(&self, id: ChannelId) -> &Channel {
        self.channels
            .get(id.0)
            .and_then(Option::as_ref)
            .unwrap_or_else(|| panic!("channel {:?} is not open", id))
    }

    fn channel_mut(&mut self, id: ChannelId) -> &mut Channel {
        self.channels
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("channel {:?} is not open", id))
    }

    fn active_mut(&mut self) -> &mut Channel {
        let id = self.active.expect("emitting bytecode with no active channel");
        self.channel_mut(id)
    }

    /// Current size of a channel, which is also the offset of the next write
    pub fn size(&self, id: ChannelId) -> usize {
        self.channel(id).bytes.len()
    }

    /// Bytes written so far to a channel
    pub fn bytes(&self, id: ChannelId) -> &[u8] {
        &self.channel(id).bytes
    }

    /// Encode an instruction into the active channel, returning the offset of its opcode
    ///
    /// Operands are written big-endian, with widths taken from the opcode's operand table.
    pub fn emit(&mut self, opcode: Opcode, operands: &[u16]) -> usize {
        let widths = opcode.operands();
        assert_eq!(
            widths.len(),
            operands.len(),
            "wrong number of operands for {:?}",
            opcode
        );

        let channel = self.active_mut();
        let offset = channel.bytes.len();
        channel.request_capacity(opcode.length());
        channel.write(&[opcode as u8]);
        for (width, operand) in widths.iter().zip(operands) {
            match width {
                OperandWidth::U8 => {
                    let byte = u8::try_from(*operand)
                        .unwrap_or_else(|_| panic!("operand {} of {:?} exceeds u8", operand, opcode));
                    channel.write(&[byte]);
                }
                OperandWidth::U16 => channel.write(&operand.to_be_bytes()),
            }
        }
        offset
    }

    /// Overwrite two already-written bytes of a channel with a big-endian value
    pub fn patch_u16(&mut self, id: ChannelId, offset: usize, value: u16) {
        let channel = self.channel_mut(id);
        let len = channel.bytes.len();
        let slot = channel
            .bytes
            .get_mut(offset..offset + 2)
            .unwrap_or_else(|| panic!("patch at {} is outside channel of {} bytes", offset, len));
        slot.copy_from_slice(&value.to_be_bytes());
    }
}
