//! Single-pass iteration over shaped atoms

use std::cell::RefCell;
use std::rc::Rc;

use bagscript_engine::font::Atom;
use rhai::{Dynamic, Map, INT};

use crate::adapters::font::AtomHandle;
use crate::adapters::Foreign;
use crate::error::Arity;
use crate::protocol::{
    attributes, method, AttributeAccessible, Comparable, Identified, Operable, Truthy,
};

#[derive(Debug, Default)]
struct State {
    atoms: Vec<Atom>,
    position: usize,
    /// Index and handle of the last atom returned by `next`
    current: Option<(usize, AtomHandle)>,
}

/// Iterator over the result of `font.shape()`. Clones share their
/// position, so an iterator is consumed once no matter how many script
/// variables refer to it.
#[derive(Debug, Clone, Default)]
pub struct AtomIterator {
    state: Rc<RefCell<State>>,
}

impl AtomIterator {
    pub fn new(atoms: Vec<Atom>) -> Self {
        AtomIterator {
            state: Rc::new(RefCell::new(State {
                atoms,
                position: 0,
                current: None,
            })),
        }
    }

    /// The next atom, or `None` from now on once exhausted
    pub fn next_atom(&self) -> Option<AtomHandle> {
        let mut state = self.state.borrow_mut();
        let index = state.position;
        match state.atoms.get(index).cloned() {
            Some(atom) => {
                let handle = AtomHandle::new(atom);
                state.position += 1;
                state.current = Some((index, handle.clone()));
                Some(handle)
            }
            None => {
                state.current = None;
                None
            }
        }
    }

    /// Index and atom of the last successful `next_atom`
    pub fn current_entry(&self) -> Option<(usize, AtomHandle)> {
        self.state.borrow().current.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        let state = self.state.borrow();
        state.atoms.len().saturating_sub(state.position)
    }

    /// Take every remaining atom, for `for` loops
    pub fn drain(&self) -> Vec<Dynamic> {
        std::iter::from_fn(|| self.next_atom())
            .map(|atom| Dynamic::from(Foreign::Atom(atom)))
            .collect()
    }
}

attributes! {
    AtomsAttr {
        fields { Len => "len", Remaining => "remaining" }
        methods { Next => "next", Entry => "entry" }
    }
}

const TAG: &str = "font.atoms";

impl Identified for AtomIterator {
    fn type_tag(&self) -> &'static str {
        TAG
    }

    fn identity(&self) -> Option<usize> {
        Some(Rc::as_ptr(&self.state) as *const () as usize)
    }

    fn display(&self) -> String {
        format!("atoms({} of {} left)", self.remaining(), self.len())
    }

    fn cost(&self) -> u64 {
        self.remaining() as u64
    }
}

impl AttributeAccessible for AtomIterator {
    fn get_attribute(&self, name: &str) -> Option<Dynamic> {
        let value = match AtomsAttr::from_name(name)? {
            AtomsAttr::Len => Dynamic::from(self.len() as INT),
            AtomsAttr::Remaining => Dynamic::from(self.remaining() as INT),
            AtomsAttr::Next => {
                let iter = self.clone();
                method("atoms.next", Arity::Exact(0), move |_ctx, _args| {
                    Ok(iter
                        .next_atom()
                        .map(|atom| Dynamic::from(Foreign::Atom(atom)))
                        .unwrap_or(Dynamic::UNIT))
                })
            }
            AtomsAttr::Entry => {
                let iter = self.clone();
                method("atoms.entry", Arity::Exact(0), move |_ctx, _args| {
                    Ok(match iter.current_entry() {
                        Some((index, atom)) => {
                            let mut entry = Map::new();
                            entry.insert("index".into(), Dynamic::from(index as INT));
                            entry.insert("value".into(), Dynamic::from(Foreign::Atom(atom)));
                            Dynamic::from_map(entry)
                        }
                        None => Dynamic::UNIT,
                    })
                })
            }
        };
        Some(value)
    }
}

impl Comparable for AtomIterator {}

impl Truthy for AtomIterator {
    fn is_truthy(&self) -> bool {
        self.remaining() > 0
    }
}

impl Operable for AtomIterator {}
