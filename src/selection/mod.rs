//! Selection of the objects that enter matching.
//!
//! Matching itself performs no filtering; callers hand it only the objects
//! that pass the analysis selection:
//!
//! - [`QualityCuts`]: minimum pt and maximum |eta|, per kind of reference
//!   object ([`ReferenceCuts`])
//! - [`CutExpression`]: additional string cuts such as `pt>30 && |eta|<2.1`
//! - [`LeptonPollutionVeto`]: drops jets whose generator jet overlaps a prompt
//!   generator lepton
//! - [`GenJetLink`]: reconstructed jets must point at a generator jet
//! - PDG id and promptness for generator-level electron and muon references
//! - isolation from other objects of the same collection

pub mod cuts;
pub mod quality;

pub use cuts::{CutError, CutExpression};
pub use quality::{is_prompt_lepton, LeptonPollutionVeto, QualityCuts, ReferenceCuts};

use tracing::{debug, warn};

use crate::core::event::{Event, EventError};
use crate::core::types::MatchObject;
use crate::utils::validation::as_integer;

/// Index branch tying objects of one collection to generator jets,
/// e.g. `Jet_genJetIdx` into `GenJet`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenJetLink<'a> {
    /// Variable of the selected collection holding the generator jet index
    pub index_variable: &'a str,
    /// Generator jet collection
    pub gen_jet: &'a str,
}

/// Selects the objects of one collection that pass all configured requirements
#[derive(Debug, Clone)]
pub struct ObjectSelector<'a> {
    collection: &'a str,
    quality: QualityCuts,
    extra: Option<&'a CutExpression>,
    veto: Option<&'a LeptonPollutionVeto>,
    gen_jet_link: Option<GenJetLink<'a>>,
    pdg_id: Option<i64>,
    require_prompt: bool,
    isolation: Option<f64>,
}

impl<'a> ObjectSelector<'a> {
    #[must_use]
    pub fn new(collection: &'a str, quality: QualityCuts) -> Self {
        Self {
            collection,
            quality,
            extra: None,
            veto: None,
            gen_jet_link: None,
            pdg_id: None,
            require_prompt: false,
            isolation: None,
        }
    }

    #[must_use]
    pub fn with_extra_cuts(mut self, extra: Option<&'a CutExpression>) -> Self {
        self.extra = extra;
        self
    }

    /// Veto evaluated at the object's generator jet: the linked one when a
    /// [`GenJetLink`] is set, otherwise the object itself
    #[must_use]
    pub fn with_pollution_veto(mut self, veto: Option<&'a LeptonPollutionVeto>) -> Self {
        self.veto = veto;
        self
    }

    /// Keep only objects whose generator jet index is within the generator
    /// jet collection
    #[must_use]
    pub fn with_gen_jet_link(mut self, link: Option<GenJetLink<'a>>) -> Self {
        self.gen_jet_link = link;
        self
    }

    /// Require `|pdgId| == pdg_id` (generator particle collections)
    #[must_use]
    pub fn with_pdg_id(mut self, pdg_id: Option<i64>) -> Self {
        self.pdg_id = pdg_id;
        self
    }

    /// Require generator particles to be prompt, see [`is_prompt_lepton`]
    #[must_use]
    pub fn with_prompt_requirement(mut self, require_prompt: bool) -> Self {
        self.require_prompt = require_prompt;
        self
    }

    /// Drop objects with another object of the collection within `dR < radius`.
    /// All objects count as neighbours, selected or not.
    #[must_use]
    pub fn with_isolation(mut self, radius: Option<f64>) -> Self {
        self.isolation = radius;
        self
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        self.collection
    }

    /// Objects of the collection that pass the selection, in collection order
    ///
    /// # Errors
    ///
    /// Returns `EventError` if a branch needed by the selection is missing or
    /// inconsistent with the collection size.
    pub fn select(&self, event: &Event) -> Result<Vec<MatchObject>, EventError> {
        let objects = event.collection(self.collection)?;
        let n = objects.len();
        let pts = event.checked_array(self.collection, "pt", n)?;
        let pdg_ids = match self.pdg_id {
            Some(_) => Some(event.checked_array(self.collection, "pdgId", n)?),
            None => None,
        };
        let prompt_branches = if self.require_prompt {
            Some((
                event.checked_array(self.collection, "status", n)?,
                event.checked_array(self.collection, "statusFlags", n)?,
            ))
        } else {
            None
        };
        let gen_jets = match self.gen_jet_link {
            Some(link) => Some((
                event.checked_array(self.collection, link.index_variable, n)?,
                event.collection(link.gen_jet)?,
            )),
            None => None,
        };
        let leptons = match self.veto {
            Some(veto) => veto.prompt_leptons(event)?,
            None => Vec::new(),
        };

        let mut selected = Vec::with_capacity(n);
        for object in &objects {
            let i = object.index;
            if !self.quality.passes(pts[i], object.position.eta) {
                continue;
            }

            if let (Some(required), Some(ids)) = (self.pdg_id, pdg_ids) {
                match as_integer(ids[i]) {
                    Some(id) if id.abs() == required => {}
                    Some(_) => continue,
                    None => {
                        warn!(
                            collection = self.collection,
                            index = i,
                            "Skipping object with non-integer pdgId"
                        );
                        continue;
                    }
                }
            }

            if let Some((statuses, flags)) = prompt_branches {
                match (as_integer(statuses[i]), as_integer(flags[i])) {
                    (Some(status), Some(flags)) if is_prompt_lepton(status, flags) => {}
                    (Some(_), Some(_)) => continue,
                    _ => {
                        warn!(
                            collection = self.collection,
                            index = i,
                            "Skipping object with non-integer status"
                        );
                        continue;
                    }
                }
            }

            let mut gen_jet_position = object.position;
            if let Some((links, gen_jets)) = &gen_jets {
                let linked = as_integer(links[i])
                    .and_then(|j| usize::try_from(j).ok())
                    .and_then(|j| gen_jets.get(j));
                match linked {
                    Some(gen_jet) => gen_jet_position = gen_jet.position,
                    None => {
                        debug!(
                            collection = self.collection,
                            index = i,
                            link = links[i],
                            "Skipping object without generator jet"
                        );
                        continue;
                    }
                }
            }

            if let Some(radius) = self.isolation {
                let crowded = objects.iter().any(|other| {
                    other.index != i && other.position.delta_r(&object.position) < radius
                });
                if crowded {
                    continue;
                }
            }

            if let Some(extra) = self.extra {
                if !extra.passes(event, self.collection, i)? {
                    continue;
                }
            }

            if let Some(veto) = self.veto {
                if veto.pollutes(&leptons, &gen_jet_position) {
                    continue;
                }
            }

            selected.push(*object);
        }

        Ok(selected)
    }
}

/// Shorthand for an [`ObjectSelector`] with quality cuts, extra cuts and the
/// pollution veto only
///
/// # Errors
///
/// See [`ObjectSelector::select`].
pub fn select_objects(
    event: &Event,
    collection: &str,
    cuts: QualityCuts,
    extra: Option<&CutExpression>,
    veto: Option<&LeptonPollutionVeto>,
) -> Result<Vec<MatchObject>, EventError> {
    ObjectSelector::new(collection, cuts)
        .with_extra_cuts(extra)
        .with_pollution_veto(veto)
        .select(event)
}
