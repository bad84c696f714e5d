/// The part of the published state a change touched.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Topic {
    Phase,
    Head,
    Refs,
    Tags,
    History,
    Index,
    Stashes,
    Submodules,
    Diff,
    CommandLog,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreEvent {
    StateChanged(Topic),
}
