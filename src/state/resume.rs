use crate::state::SourceState;

/// Decision for one keyword during resumption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipDecision {
    /// Skip this keyword entirely (it completed before the interruption)
    pub skip: bool,

    /// Page to start processing at when not skipping
    pub start_page: u32,
}

impl SkipDecision {
    fn skipped() -> Self {
        Self {
            skip: true,
            start_page: 1,
        }
    }

    fn process(start_page: u32) -> Self {
        Self {
            skip: false,
            start_page,
        }
    }
}

/// Positional resumption cursor over the ordered keyword list
///
/// While the stored resume keyword has not yet been matched, every
/// earlier-order keyword is skipped. The matching keyword resumes at the
/// stored page, and every keyword after it starts at page 1. With no stored
/// cursor every keyword processes from page 1.
///
/// The cursor is positional, not content-addressed: it is only valid against
/// the keyword list it was written for. [`crate::state::StateStore::note_keywords`]
/// drops cursors whose list fingerprint no longer matches before this cursor
/// is built.
#[derive(Debug)]
pub struct ResumeCursor {
    pending: Option<(String, u32)>,
}

impl ResumeCursor {
    /// Builds a cursor from a source's persisted state
    pub fn new(state: &SourceState) -> Self {
        Self {
            pending: state
                .resume_keyword
                .clone()
                .map(|keyword| (keyword, state.resume_page.max(1))),
        }
    }

    /// Decides whether the given keyword is skipped, and where it starts
    ///
    /// Must be called once per keyword, in list order.
    pub fn should_skip(&mut self, keyword: &str) -> SkipDecision {
        match self.pending.take() {
            Some((pending, page)) if pending == keyword => SkipDecision::process(page),
            Some(other) => {
                self.pending = Some(other);
                SkipDecision::skipped()
            }
            None => SkipDecision::process(1),
        }
    }

    /// Whether a stored keyword is still waiting to be matched
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
