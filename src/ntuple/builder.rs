use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AnalysisConfig, ConfigError, OppositeLink};
use crate::core::event::{Event, EventError};
use crate::core::types::MatchObject;
use crate::matching::engine::{DoubleCountTally, MatchingEngine};
use crate::matching::greedy::nearest_candidate;
use crate::matching::MatchError;
use crate::selection::{CutExpression, LeptonPollutionVeto};
use crate::utils::validation::as_integer;

/// Value of a cell that could not be filled, e.g. for an unmatched reference
pub const MISSING_VALUE: f64 = -999.0;

#[derive(Error, Debug)]
pub enum NtupleError {
    #[error(transparent)]
    Event(#[from] EventError),

    #[error(transparent)]
    Matching(#[from] MatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Column {0} appears more than once; the tau, reference and opposite collections must differ")]
    DuplicateColumn(String),
}

/// Variables of one collection written to the ntuple
#[derive(Debug, Clone)]
struct ColumnGroup {
    collection: String,
    variables: Vec<String>,
    /// Index of the first column of this group
    offset: usize,
}

impl ColumnGroup {
    fn fill(&self, row: &mut [f64], event: &Event, index: usize) -> Result<(), EventError> {
        for (i, variable) in self.variables.iter().enumerate() {
            row[self.offset + i] = event.object_value(&self.collection, variable, index)?;
        }
        Ok(())
    }
}

/// Counters for one ntuple production run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NtupleSummary {
    pub events: u64,
    pub rows: u64,
    /// Rows whose reference object was matched to a tau
    pub matched_rows: u64,
    /// Rows that also carry an opposite object
    pub opposite_rows: u64,
    pub double_counts: DoubleCountTally,
}

impl NtupleSummary {
    /// Fraction of events with a shared candidate among the references
    #[must_use]
    pub fn double_count_rate(&self) -> f64 {
        if self.events == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)] // Event counts stay far below 2^52
        let rate = self.double_counts.count() as f64 / self.events as f64;
        rate
    }
}

/// Builds flat ntuple rows, one per selected reference object.
///
/// The selected references of each event are matched against the comparison
/// taus. A row holds the event info, the reference object, its matched tau (if
/// any) and the opposite object of that tau (if any): the tau's seed jet in
/// efficiency mode, the nearest generator tau in fake-rate mode.
#[derive(Debug)]
pub struct NtupleBuilder {
    config: AnalysisConfig,
    extra: Option<CutExpression>,
    veto: Option<LeptonPollutionVeto>,
    engine: MatchingEngine,
    opposite_link: OppositeLink,
    columns: Vec<String>,
    reference: ColumnGroup,
    tau: ColumnGroup,
    opposite: ColumnGroup,
    rows: u64,
    matched_rows: u64,
    opposite_rows: u64,
}

impl NtupleBuilder {
    /// Create a builder for `config`
    ///
    /// # Errors
    ///
    /// Returns `NtupleError::Config` if the extra cut does not parse, or
    /// `NtupleError::DuplicateColumn` if two collections produce the same column.
    pub fn new(config: AnalysisConfig) -> Result<Self, NtupleError> {
        let extra = config.extra_cut_expression().map_err(ConfigError::from)?;
        let veto = config.pollution_veto();

        let mut columns: Vec<String> = config.variables.info.clone();
        let mut group = |collection: &str| {
            let variables = config.variables.for_collection(collection);
            let offset = columns.len();
            columns.extend(variables.iter().map(|v| format!("{collection}_{v}")));
            ColumnGroup {
                collection: collection.to_string(),
                variables,
                offset,
            }
        };
        let reference = group(config.reference_collection());
        let tau = group(&config.comparison_tau);
        let opposite = group(config.opposite_collection());

        let mut seen = HashSet::with_capacity(columns.len());
        if let Some(duplicate) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(NtupleError::DuplicateColumn(duplicate.clone()));
        }

        Ok(Self {
            engine: MatchingEngine::new(config.matching),
            opposite_link: config.opposite_link(),
            config,
            extra,
            veto,
            columns,
            reference,
            tau,
            opposite,
            rows: 0,
            matched_rows: 0,
            opposite_rows: 0,
        })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Rows for one event, in reference collection order
    ///
    /// # Errors
    ///
    /// Returns `NtupleError::Event` if a branch is missing or malformed, or
    /// `NtupleError::Matching` if an event cannot be matched.
    pub fn process_event(&mut self, event: &Event) -> Result<Vec<Vec<f64>>, NtupleError> {
        let references = self
            .config
            .reference_selector(self.extra.as_ref(), self.veto.as_ref())
            .select(event)?;
        let taus = event.collection(&self.tau.collection)?;
        let matched = self.engine.match_event(&references, &taus)?;
        let opposites = match self.opposite_link {
            OppositeLink::Nearest { .. } => event.collection(&self.opposite.collection)?,
            OppositeLink::SeedJet { .. } => Vec::new(),
        };

        let mut info = Vec::with_capacity(self.config.variables.info.len());
        for name in &self.config.variables.info {
            info.push(event.scalar(name)?);
        }

        let mut rows = Vec::with_capacity(references.len());
        for reference in &references {
            let mut row = vec![MISSING_VALUE; self.columns.len()];
            row[..info.len()].copy_from_slice(&info);
            self.reference.fill(&mut row, event, reference.index)?;

            if let Some(&tau) = matched.get(&reference.index) {
                self.tau.fill(&mut row, event, tau)?;
                self.matched_rows += 1;

                if let Some(opposite) = self.opposite_of(event, &taus[tau], &opposites)? {
                    self.opposite.fill(&mut row, event, opposite)?;
                    self.opposite_rows += 1;
                }
            }
            rows.push(row);
        }

        self.rows += rows.len() as u64;
        debug!(
            references = references.len(),
            taus = taus.len(),
            matched = matched.len(),
            "Processed event"
        );
        Ok(rows)
    }

    /// Index of the opposite object belonging to `tau`
    fn opposite_of(
        &self,
        event: &Event,
        tau: &MatchObject,
        opposites: &[MatchObject],
    ) -> Result<Option<usize>, EventError> {
        match self.opposite_link {
            OppositeLink::SeedJet { index_variable } => {
                let value = event.object_value(&self.tau.collection, index_variable, tau.index)?;
                match as_integer(value) {
                    Some(jet) => Ok(usize::try_from(jet).ok()),
                    None => {
                        warn!(
                            collection = %self.tau.collection,
                            index = tau.index,
                            value,
                            "Ignoring non-integer seed jet index"
                        );
                        Ok(None)
                    }
                }
            }
            OppositeLink::Nearest { max_radius } => {
                Ok(nearest_candidate(tau, opposites, max_radius).map(|(index, _)| index))
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> NtupleSummary {
        NtupleSummary {
            events: self.engine.events(),
            rows: self.rows,
            matched_rows: self.matched_rows,
            opposite_rows: self.opposite_rows,
            double_counts: self.engine.tally(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AnalysisMode, FakeScenario};

    fn efficiency_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::load_embedded().unwrap();
        config.variables.info = vec!["event".to_string()];
        config.variables.objects.clear();
        config
    }

    fn fake_rate_config(scenario: FakeScenario) -> AnalysisConfig {
        let mut config = efficiency_config();
        config.mode = AnalysisMode::FakeRate { scenario };
        config
    }

    /// Two generator taus; tau 0 is reconstructed and seeded by jet 1
    fn efficiency_event() -> Event {
        Event::new()
            .with_scalar("event", 7.0)
            .with_array("GenVisTau_pt", vec![35.0, 28.0])
            .with_array("GenVisTau_eta", vec![0.2, -1.0])
            .with_array("GenVisTau_phi", vec![1.0, -2.0])
            .with_array("Tau_pt", vec![33.0])
            .with_array("Tau_eta", vec![0.21])
            .with_array("Tau_phi", vec![1.02])
            .with_array("Tau_jetIdx", vec![1.0])
            .with_array("Jet_pt", vec![50.0, 40.0])
            .with_array("Jet_eta", vec![2.0, 0.22])
            .with_array("Jet_phi", vec![0.0, 1.01])
    }

    /// Efficiency event plus generator jets and one muon far from every jet
    fn reco_jet_event() -> Event {
        efficiency_event()
            .with_array("Jet_genJetIdx", vec![0.0, 1.0])
            .with_array("GenJet_eta", vec![2.0, 0.2])
            .with_array("GenJet_phi", vec![0.0, 1.0])
            .with_array("GenPart_pt", vec![30.0])
            .with_array("GenPart_eta", vec![-2.0])
            .with_array("GenPart_phi", vec![-3.0])
            .with_array("GenPart_pdgId", vec![13.0])
            .with_array("GenPart_status", vec![1.0])
            .with_array("GenPart_statusFlags", vec![1.0])
    }

    #[test]
    fn test_columns() {
        let builder = NtupleBuilder::new(efficiency_config()).unwrap();
        assert_eq!(
            builder.columns(),
            [
                "event",
                "GenVisTau_pt",
                "GenVisTau_eta",
                "GenVisTau_phi",
                "Tau_pt",
                "Tau_eta",
                "Tau_phi",
                "Jet_pt",
                "Jet_eta",
                "Jet_phi",
            ]
        );
    }

    #[test]
    fn test_efficiency_rows() {
        let mut builder = NtupleBuilder::new(efficiency_config()).unwrap();
        let rows = builder.process_event(&efficiency_event()).unwrap();
        assert_eq!(rows.len(), 2);

        let matched = &rows[0];
        assert_eq!(matched[0], 7.0);
        assert_eq!(matched[1], 35.0);
        assert_eq!(matched[4], 33.0);
        assert_eq!(matched[7], 40.0);

        let unmatched = &rows[1];
        assert_eq!(unmatched[1], 28.0);
        assert!(unmatched[4..].iter().all(|&v| v == MISSING_VALUE));

        let summary = builder.summary();
        assert_eq!(summary.events, 1);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.matched_rows, 1);
        assert_eq!(summary.opposite_rows, 1);
        assert_eq!(summary.double_counts.count(), 0);
    }

    #[test]
    fn test_seed_jet_wins_over_nearest_jet() {
        let event = Event::new()
            .with_scalar("event", 1.0)
            .with_array("GenVisTau_pt", vec![30.0])
            .with_array("GenVisTau_eta", vec![0.0])
            .with_array("GenVisTau_phi", vec![0.0])
            .with_array("Tau_pt", vec![28.0])
            .with_array("Tau_eta", vec![0.0])
            .with_array("Tau_phi", vec![0.0])
            .with_array("Tau_jetIdx", vec![0.0])
            .with_array("Jet_pt", vec![45.0, 12.0])
            .with_array("Jet_eta", vec![0.0, 0.0])
            .with_array("Jet_phi", vec![0.2, 0.01]);

        let mut builder = NtupleBuilder::new(efficiency_config()).unwrap();
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows[0][7], 45.0);

        let event = event.with_array("Tau_jetIdx", vec![-1.0]);
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows[0][4], 28.0);
        assert!(rows[0][7..].iter().all(|&v| v == MISSING_VALUE));
    }

    #[test]
    fn test_seed_jet_index_required() {
        let mut builder = NtupleBuilder::new(efficiency_config()).unwrap();
        let event = efficiency_event().with_array("Tau_jetIdx", vec![5.0]);
        assert!(matches!(
            builder.process_event(&event),
            Err(NtupleError::Event(EventError::IndexOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_soft_gen_taus_kept() {
        let event = efficiency_event().with_array("GenVisTau_pt", vec![35.0, 15.0]);
        let mut builder = NtupleBuilder::new(efficiency_config()).unwrap();
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], 15.0);
    }

    #[test]
    fn test_quality_cuts_drop_references() {
        let mut config = efficiency_config();
        config.quality_cuts.gen_tau.pt_min = 30.0;
        let mut builder = NtupleBuilder::new(config).unwrap();
        let rows = builder.process_event(&efficiency_event()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_isolated_gen_taus() {
        let event = efficiency_event()
            .with_array("GenVisTau_eta", vec![0.2, 0.2])
            .with_array("GenVisTau_phi", vec![1.0, 1.4]);
        let mut config = efficiency_config();
        config.isolate_gen_taus = true;
        let mut builder = NtupleBuilder::new(config).unwrap();
        assert!(builder.process_event(&event).unwrap().is_empty());
    }

    #[test]
    fn test_reco_jet_references() {
        let mut builder = NtupleBuilder::new(fake_rate_config(FakeScenario::RecoJets)).unwrap();
        assert!(builder.columns()[1].starts_with("Jet_"));
        assert!(builder.columns()[7].starts_with("GenVisTau_"));

        let rows = builder.process_event(&reco_jet_event()).unwrap();
        // both jets pass the quality cuts, only jet 1 is near the tau
        assert_eq!(rows.len(), 2);
        assert!(rows[0][4..].iter().all(|&v| v == MISSING_VALUE));
        // jet 1 is matched to tau 0, whose nearest generator tau is tau 0
        assert_eq!(rows[1][4], 33.0);
        assert_eq!(rows[1][7], 35.0);
    }

    #[test]
    fn test_reco_jets_need_gen_jet() {
        let event = reco_jet_event().with_array("Jet_genJetIdx", vec![-1.0, 1.0]);
        let mut builder = NtupleBuilder::new(fake_rate_config(FakeScenario::RecoJets)).unwrap();
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], 40.0);

        let event = reco_jet_event().with_array("Jet_genJetIdx", vec![0.0, 2.0]);
        assert_eq!(builder.process_event(&event).unwrap().len(), 1);
    }

    #[test]
    fn test_jet_near_prompt_muon_vetoed() {
        // muon 0.4 away from jet 1 and its generator jet
        let event = reco_jet_event()
            .with_array("GenPart_eta", vec![0.2])
            .with_array("GenPart_phi", vec![1.4]);

        let mut builder = NtupleBuilder::new(fake_rate_config(FakeScenario::RecoJets)).unwrap();
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], 50.0);

        let mut config = fake_rate_config(FakeScenario::RecoJets);
        config.veto_lepton_pollution = false;
        let mut builder = NtupleBuilder::new(config).unwrap();
        assert_eq!(builder.process_event(&event).unwrap().len(), 2);
    }

    #[test]
    fn test_fake_electrons_must_be_prompt() {
        let event = efficiency_event()
            .with_array("GenPart_pt", vec![30.0])
            .with_array("GenPart_eta", vec![0.21])
            .with_array("GenPart_phi", vec![1.02])
            .with_array("GenPart_pdgId", vec![11.0])
            .with_array("GenPart_status", vec![1.0])
            .with_array("GenPart_statusFlags", vec![0.0]);
        let mut builder =
            NtupleBuilder::new(fake_rate_config(FakeScenario::FakeElectrons)).unwrap();
        assert!(builder.process_event(&event).unwrap().is_empty());

        let event = event.with_array("GenPart_statusFlags", vec![1.0]);
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][4], 33.0);
    }

    #[test]
    fn test_gen_tau_beyond_cone_not_filled() {
        // generator tau 0 moved 0.4 away from the reco tau
        let event = reco_jet_event().with_array("GenVisTau_phi", vec![1.42, -2.0]);
        let mut builder = NtupleBuilder::new(fake_rate_config(FakeScenario::RecoJets)).unwrap();
        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows[1][4], 33.0);
        assert!(rows[1][7..].iter().all(|&v| v == MISSING_VALUE));
        assert_eq!(builder.summary().opposite_rows, 0);
    }

    #[test]
    fn test_double_count_is_tallied() {
        let mut builder = NtupleBuilder::new(efficiency_config()).unwrap();
        let event = Event::new()
            .with_scalar("event", 1.0)
            .with_array("GenVisTau_pt", vec![30.0, 30.0])
            .with_array("GenVisTau_eta", vec![0.0, 0.0])
            .with_array("GenVisTau_phi", vec![0.0, 0.1])
            .with_array("Tau_pt", vec![30.0, 30.0])
            .with_array("Tau_eta", vec![0.0, 0.0])
            .with_array("Tau_phi", vec![0.04, 0.3])
            .with_array("Tau_jetIdx", vec![-1.0, -1.0])
            .with_array("Jet_pt", vec![])
            .with_array("Jet_eta", vec![])
            .with_array("Jet_phi", vec![]);

        let rows = builder.process_event(&event).unwrap();
        assert_eq!(rows.len(), 2);
        let summary = builder.summary();
        assert_eq!(summary.double_counts.count(), 1);
        assert_eq!(summary.matched_rows, 1);
        assert!((summary.double_count_rate() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut config = efficiency_config();
        config.comparison_tau = "Jet".to_string();
        assert!(matches!(
            NtupleBuilder::new(config),
            Err(NtupleError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_missing_info_branch_is_error() {
        let mut config = efficiency_config();
        config.variables.info.push("luminosityBlock".to_string());
        let mut builder = NtupleBuilder::new(config).unwrap();
        assert!(matches!(
            builder.process_event(&efficiency_event()),
            Err(NtupleError::Event(EventError::MissingBranch(_)))
        ));
    }
}
