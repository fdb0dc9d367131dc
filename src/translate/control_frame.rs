use crate::feb::Label;

/// Loop currently being translated
#[derive(Debug)]
pub struct LoopFrame {
    /// Unique (per function) identifier, matched against [`BreakRecord::loop_identifier`]
    pub identifier: u32,

    /// Source label (`outer: while (...)`)
    pub label: Option<String>,

    /// Where `continue` jumps to (the condition of a `while`, `hasNext` of a `for`)
    pub continue_label: Label,
}

/// `break` whose jump is patched once the targeted loop is fully translated
#[derive(Debug)]
pub struct BreakRecord {
    pub loop_identifier: u32,

    /// Channel offset of the jump's placeholder operand
    pub patch_offset: usize,
}

/// Stack of enclosing loops plus the pending breaks out of them
#[derive(Debug, Default)]
pub struct LoopStack {
    frames: Vec<LoopFrame>,
    next_identifier: u32,
    break_records: Vec<BreakRecord>,
}

impl LoopStack {
    pub fn new() -> LoopStack {
        LoopStack::default()
    }

    /// Enter a loop, returning its identifier
    pub fn push(&mut self, label: Option<String>, continue_label: Label) -> u32 {
        let identifier = self.next_identifier;
        self.next_identifier += 1;
        self.frames.push(LoopFrame {
            identifier,
            label,
            continue_label,
        });
        identifier
    }

    /// Leave the innermost loop, returning the breaks targeting it
    pub fn pop(&mut self) -> Vec<BreakRecord> {
        let frame = self.frames.pop().expect("no loop to leave");
        let (matched, pending) = std::mem::take(&mut self.break_records)
            .into_iter()
            .partition(|record| record.loop_identifier == frame.identifier);
        self.break_records = pending;
        matched
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Find the loop targeted by a `break`/`continue`
    ///
    /// Without a label, this is the innermost loop.
    pub fn find(&self, label: Option<&str>) -> Option<&LoopFrame> {
        match label {
            None => self.frames.last(),
            Some(label) => self
                .frames
                .iter()
                .rev()
                .find(|frame| frame.label.as_deref() == Some(label)),
        }
    }

    pub fn record_break(&mut self, loop_identifier: u32, patch_offset: usize) {
        self.break_records.push(BreakRecord {
            loop_identifier,
            patch_offset,
        });
    }

    /// Breaks not yet resolved by their loop
    pub fn pending_breaks(&self) -> usize {
        self.break_records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feb::{ChannelSet, CodeBuilder};

    #[test]
    fn breaks_resolve_against_their_loop() {
        let mut channels = ChannelSet::new();
        let mut code = CodeBuilder::new(&mut channels);
        let outer_start = code.fresh_label();
        let inner_start = code.fresh_label();

        let mut loops = LoopStack::new();
        let outer = loops.push(Some(String::from("outer")), outer_start);
        let inner = loops.push(None, inner_start);
        assert_ne!(outer, inner);

        assert_eq!(loops.find(None).unwrap().identifier, inner);
        assert_eq!(loops.find(Some("outer")).unwrap().identifier, outer);
        assert!(loops.find(Some("missing")).is_none());

        loops.record_break(inner, 3);
        loops.record_break(outer, 7);
        loops.record_break(inner, 12);
        assert_eq!(loops.pending_breaks(), 3);

        let inner_breaks = loops.pop();
        let offsets: Vec<usize> = inner_breaks.iter().map(|r| r.patch_offset).collect();
        assert_eq!(offsets, vec![3, 12]);
        assert_eq!(loops.pending_breaks(), 1);

        let outer_breaks = loops.pop();
        assert_eq!(outer_breaks.len(), 1);
        assert_eq!(outer_breaks[0].patch_offset, 7);
        assert!(loops.is_empty());
        assert_eq!(loops.pending_breaks(), 0);
    }
}
