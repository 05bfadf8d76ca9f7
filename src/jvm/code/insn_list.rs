use super::{Insn, Label, LabelGenerator};
use crate::jvm::Error;
use std::fmt;

/// Stable handle to a node in an [`InsnList`]
///
/// Handles are never invalidated by inserts or splices; removing a node
/// retires its handle permanently.
#[derive(Copy, Clone, Hash, Eq, PartialEq)]
pub struct InsnId(usize);

impl fmt::Debug for InsnId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("i{}", self.0))
    }
}

struct Node {
    insn: Insn,
    prev: Option<InsnId>,
    next: Option<InsnId>,
    live: bool,
}

/// Ordered, doubly-linked sequence of instruction nodes
///
/// Nodes live in a flat arena indexed by [`InsnId`], with the order carried
/// by intra-arena prev/next links. Insertion and removal touch only the
/// neighbors of the affected node, so handles held across surgery stay
/// valid. Labels are allocated from the list's own [`LabelGenerator`], which
/// keeps every label reference resolvable within the same list.
pub struct InsnList {
    nodes: Vec<Node>,
    head: Option<InsnId>,
    tail: Option<InsnId>,
    len: usize,
    label_generator: LabelGenerator,
}

impl Default for InsnList {
    fn default() -> InsnList {
        InsnList::new()
    }
}

impl InsnList {
    pub fn new() -> InsnList {
        InsnList {
            nodes: vec![],
            head: None,
            tail: None,
            len: 0,
            label_generator: LabelGenerator::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn fresh_label(&mut self) -> Label {
        self.label_generator.fresh_label()
    }

    pub fn first(&self) -> Option<InsnId> {
        self.head
    }

    pub fn last(&self) -> Option<InsnId> {
        self.tail
    }

    /// Is this handle a live member of the list?
    pub fn contains(&self, id: InsnId) -> bool {
        self.nodes.get(id.0).map_or(false, |node| node.live)
    }

    pub fn get(&self, id: InsnId) -> Option<&Insn> {
        let node = self.nodes.get(id.0)?;
        node.live.then(|| &node.insn)
    }

    pub fn get_mut(&mut self, id: InsnId) -> Option<&mut Insn> {
        let node = self.nodes.get_mut(id.0)?;
        node.live.then(|| &mut node.insn)
    }

    pub fn next(&self, id: InsnId) -> Option<InsnId> {
        self.nodes.get(id.0).filter(|node| node.live)?.next
    }

    pub fn prev(&self, id: InsnId) -> Option<InsnId> {
        self.nodes.get(id.0).filter(|node| node.live)?.prev
    }

    pub fn push_back(&mut self, insn: Insn) -> InsnId {
        let id = InsnId(self.nodes.len());
        self.nodes.push(Node {
            insn,
            prev: self.tail,
            next: None,
            live: true,
        });
        match self.tail {
            Some(tail) => self.nodes[tail.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Insert one instruction immediately before `anchor`
    pub fn insert_before(&mut self, anchor: InsnId, insn: Insn) -> Result<InsnId, Error> {
        if !self.contains(anchor) {
            return Err(Error::InconsistentState(format!(
                "Insertion anchor {:?} is not a member of the instruction list",
                anchor
            )));
        }
        let id = InsnId(self.nodes.len());
        let prev = self.nodes[anchor.0].prev;
        self.nodes.push(Node {
            insn,
            prev,
            next: Some(anchor),
            live: true,
        });
        self.nodes[anchor.0].prev = Some(id);
        match prev {
            Some(prev) => self.nodes[prev.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.len += 1;
        Ok(id)
    }

    /// Unlink a node, permanently retiring its handle
    pub fn remove(&mut self, id: InsnId) -> Result<(), Error> {
        if !self.contains(id) {
            return Err(Error::InconsistentState(format!(
                "Cannot remove {:?}: not a member of the instruction list",
                id
            )));
        }
        let Node { prev, next, .. } = self.nodes[id.0];
        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => self.tail = prev,
        }
        let node = &mut self.nodes[id.0];
        node.live = false;
        node.prev = None;
        node.next = None;
        self.len -= 1;
        Ok(())
    }

    /// Iterate over live nodes in list order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    /// Canonical label node of a chain of adjacent labels
    ///
    /// Labels that fall together (no real instruction between them) denote
    /// the same position; the first one in the chain is the canonical
    /// identity.
    pub fn first_label_in_chain(&self, id: InsnId) -> InsnId {
        let mut current = id;
        while let Some(prev) = self.prev(current) {
            match self.get(prev) {
                Some(Insn::Label(_)) => current = prev,
                _ => break,
            }
        }
        current
    }

    /// Splice every instruction of `source`, in original order, immediately
    /// before `anchor`
    ///
    /// The relative order of the inserted instructions matches `source`
    /// exactly, and all other instructions keep their positions. Labels of
    /// `source` are renumbered into this list's label space so that branch
    /// references keep resolving within one list; handles into `source` are
    /// not usable against the destination.
    pub fn splice_before(&mut self, source: InsnList, anchor: InsnId) -> Result<(), Error> {
        if !self.contains(anchor) {
            return Err(Error::InconsistentState(format!(
                "Splice anchor {:?} is not a member of the destination list",
                anchor
            )));
        }
        if source.is_empty() {
            return Ok(());
        }

        let label_base = self
            .label_generator
            .absorb(source.label_generator.watermark());
        let node_base = self.nodes.len();
        let relink = |id: Option<InsnId>| id.map(|id| InsnId(id.0 + node_base));

        let source_head = relink(source.head);
        let source_tail = relink(source.tail);
        let source_len = source.len;

        for mut node in source.nodes {
            node.prev = relink(node.prev);
            node.next = relink(node.next);
            relabel(&mut node.insn, label_base);
            self.nodes.push(node);
        }

        // Link the [source_head, source_tail] chain in before the anchor
        let before = self.nodes[anchor.0].prev;
        let (source_head, source_tail) = match (source_head, source_tail) {
            (Some(head), Some(tail)) => (head, tail),
            _ => return Ok(()), // unreachable: source was non-empty
        };
        self.nodes[source_head.0].prev = before;
        self.nodes[source_tail.0].next = Some(anchor);
        self.nodes[anchor.0].prev = Some(source_tail);
        match before {
            Some(before) => self.nodes[before.0].next = Some(source_head),
            None => self.head = Some(source_head),
        }
        self.len += source_len;
        Ok(())
    }
}

/// Push every label reference in an instruction up by `base`
fn relabel(insn: &mut Insn, base: u32) {
    match insn {
        Insn::Label(label) => *label = label.offset_by(base),
        Insn::LineNumber { start, .. } => *start = start.offset_by(base),
        Insn::Jump { target, .. } => *target = target.offset_by(base),
        Insn::TableSwitch {
            default, targets, ..
        } => {
            *default = default.offset_by(base);
            for target in targets {
                *target = target.offset_by(base);
            }
        }
        Insn::LookupSwitch { default, pairs } => {
            *default = default.offset_by(base);
            for (_, target) in pairs {
                *target = target.offset_by(base);
            }
        }
        _ => (),
    }
}

pub struct Iter<'a> {
    list: &'a InsnList,
    cursor: Option<InsnId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (InsnId, &'a Insn);

    fn next(&mut self) -> Option<(InsnId, &'a Insn)> {
        let id = self.cursor?;
        self.cursor = self.list.next(id);
        Some((id, self.list.get(id)?))
    }
}

impl<'a> IntoIterator for &'a InsnList {
    type Item = (InsnId, &'a Insn);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl fmt::Debug for InsnList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.iter().map(|(_, insn)| insn))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::super::opcodes::*;
    use super::*;

    fn simple_list(opcodes: &[u8]) -> InsnList {
        let mut list = InsnList::new();
        for &opcode in opcodes {
            list.push_back(Insn::Simple(opcode));
        }
        list
    }

    fn collected(list: &InsnList) -> Vec<Insn> {
        list.iter().map(|(_, insn)| insn.clone()).collect()
    }

    #[test]
    fn push_and_iterate() {
        let list = simple_list(&[NOP, POP, RETURN]);
        assert_eq!(
            collected(&list),
            vec![Insn::Simple(NOP), Insn::Simple(POP), Insn::Simple(RETURN)]
        );
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn insert_before_head_and_middle() {
        let mut list = simple_list(&[POP, RETURN]);
        let head = list.first().unwrap();
        list.insert_before(head, Insn::Simple(NOP)).unwrap();
        let ret = list.last().unwrap();
        list.insert_before(ret, Insn::Simple(DUP)).unwrap();
        assert_eq!(
            collected(&list),
            vec![
                Insn::Simple(NOP),
                Insn::Simple(POP),
                Insn::Simple(DUP),
                Insn::Simple(RETURN)
            ]
        );
    }

    #[test]
    fn remove_retires_handle() {
        let mut list = simple_list(&[NOP, POP, RETURN]);
        let middle = list.next(list.first().unwrap()).unwrap();
        list.remove(middle).unwrap();
        assert_eq!(
            collected(&list),
            vec![Insn::Simple(NOP), Insn::Simple(RETURN)]
        );
        assert!(!list.contains(middle));
        assert!(matches!(
            list.remove(middle),
            Err(Error::InconsistentState(_))
        ));
        assert!(matches!(
            list.insert_before(middle, Insn::Simple(NOP)),
            Err(Error::InconsistentState(_))
        ));
    }

    #[test]
    fn splice_preserves_order() {
        let mut dest = simple_list(&[NOP, POP, RETURN]);
        let source = simple_list(&[DUP, SWAP, POP2]);
        let anchor = dest.next(dest.first().unwrap()).unwrap(); // the POP
        dest.splice_before(source, anchor).unwrap();
        assert_eq!(
            collected(&dest),
            vec![
                Insn::Simple(NOP),
                Insn::Simple(DUP),
                Insn::Simple(SWAP),
                Insn::Simple(POP2),
                Insn::Simple(POP),
                Insn::Simple(RETURN)
            ]
        );
        assert_eq!(dest.len(), 6);
    }

    #[test]
    fn splice_before_head() {
        let mut dest = simple_list(&[RETURN]);
        let source = simple_list(&[NOP]);
        let anchor = dest.first().unwrap();
        dest.splice_before(source, anchor).unwrap();
        assert_eq!(
            collected(&dest),
            vec![Insn::Simple(NOP), Insn::Simple(RETURN)]
        );
        assert_eq!(dest.first().map(|id| dest.get(id).cloned()).flatten(), Some(Insn::Simple(NOP)));
    }

    #[test]
    fn splice_renumbers_source_labels() {
        let mut dest = simple_list(&[RETURN]);
        let dest_label = dest.fresh_label();
        let anchor = dest.first().unwrap();
        dest.insert_before(anchor, Insn::Label(dest_label)).unwrap();

        let mut source = InsnList::new();
        let source_label = source.fresh_label();
        source.push_back(Insn::Label(source_label));
        source.push_back(Insn::Jump {
            opcode: GOTO,
            target: source_label,
        });

        dest.splice_before(source, anchor).unwrap();

        let insns = collected(&dest);
        match (&insns[1], &insns[2]) {
            (Insn::Label(spliced), Insn::Jump { target, .. }) => {
                assert_eq!(spliced, target);
                assert_ne!(*spliced, dest_label);
            }
            other => panic!("unexpected spliced shape: {:?}", other),
        }
    }

    #[test]
    fn splice_rejects_dead_anchor() {
        let mut dest = simple_list(&[NOP, RETURN]);
        let anchor = dest.first().unwrap();
        dest.remove(anchor).unwrap();
        let source = simple_list(&[POP]);
        assert!(matches!(
            dest.splice_before(source, anchor),
            Err(Error::InconsistentState(_))
        ));
    }

    #[test]
    fn first_label_in_chain_walks_back() {
        let mut list = InsnList::new();
        let (l0, l1, l2) = (list.fresh_label(), list.fresh_label(), list.fresh_label());
        list.push_back(Insn::Simple(NOP));
        let first = list.push_back(Insn::Label(l0));
        list.push_back(Insn::Label(l1));
        let last = list.push_back(Insn::Label(l2));
        let ret = list.push_back(Insn::Simple(RETURN));

        assert_eq!(list.first_label_in_chain(last), first);
        assert_eq!(list.first_label_in_chain(first), first);
        // a non-label node with label predecessors walks back too
        assert_eq!(list.first_label_in_chain(ret), first);
    }
}
