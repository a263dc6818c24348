//! Router - pending リンクを 2 つの実行クラスに振り分ける（純粋関数）

use crate::domain::LinkInput;
use crate::resolver::DomainSet;

/// Disjoint split of the pending links, original order preserved in each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Routed {
    /// Bypass-required links, run one at a time under the budget.
    pub timer: Vec<LinkInput>,
    /// Everything else, run concurrently.
    pub direct: Vec<LinkInput>,
}

impl Routed {
    pub fn is_empty(&self) -> bool {
        self.timer.is_empty() && self.direct.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timer.len() + self.direct.len()
    }
}

/// Terminal links (done / error) are dropped.
pub fn route(links: &[LinkInput], bypass: &DomainSet) -> Routed {
    let (timer, direct) = links
        .iter()
        .filter(|l| l.is_pending())
        .cloned()
        .partition(|l| bypass.matches(&l.link));
    Routed { timer, direct }
}
