use mznetwork::network::BuildSummary;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    pub features_read: usize,
    pub features_dropped: usize,
    pub features_kept: usize,
    pub nodes: usize,
    pub edges: usize,
    pub pairs_examined: usize,
    pub overwritten_edges: usize,
    pub paths: usize,
}

impl ProgressRecord {
    pub fn update_from_build(&mut self, summary: &BuildSummary) {
        self.pairs_examined += summary.pairs;
        self.overwritten_edges += summary.overwritten;
    }
}
