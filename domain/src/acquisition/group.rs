//! Acquisition group entities
//!
//! The slot-name fan-in (`{g}_image`, `{g}_bval`, ...) is resolved exactly
//! once, in [`AcquisitionGroupSet::build`]. Everything downstream works with
//! typed [`AcquisitionGroup`] records.

use crate::acquisition::artifact::{ArtifactRef, ArtifactSlot, CONFOUNDS_SUFFIX};
use crate::core::error::DomainError;
use crate::core::group_id::GroupId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One distortion / phase-encoding group (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionGroup {
    pub id: GroupId,
    /// Final, corrected series
    pub image: ArtifactRef,
    pub bval: ArtifactRef,
    /// Final (possibly rotated) b-vectors
    pub bvec: ArtifactRef,
    /// b-vectors before motion correction
    pub original_bvec: ArtifactRef,
    pub original_image: ArtifactRef,
    pub raw_concatenated_image: ArtifactRef,
    pub b0_reference: ArtifactRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confounds: Option<ArtifactRef>,
}

impl AcquisitionGroup {
    pub fn artifact(&self, slot: ArtifactSlot) -> &ArtifactRef {
        match slot {
            ArtifactSlot::Image => &self.image,
            ArtifactSlot::Bval => &self.bval,
            ArtifactSlot::Bvec => &self.bvec,
            ArtifactSlot::OriginalBvec => &self.original_bvec,
            ArtifactSlot::OriginalImage => &self.original_image,
            ArtifactSlot::RawConcatenatedImage => &self.raw_concatenated_image,
            ArtifactSlot::B0Reference => &self.b0_reference,
        }
    }
}

/// Ordered, validated collection of acquisition groups (Aggregate)
///
/// Immutable once built. Group order is the order of the identifiers passed
/// to [`AcquisitionGroupSet::build`], and every per-slot sequence follows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionGroupSet {
    groups: Vec<AcquisitionGroup>,
}

impl AcquisitionGroupSet {
    /// Resolve the per-group slot names into typed groups
    ///
    /// `fields` maps slot names (`{g}_image`, `{g}_bval`, ...) to artifacts,
    /// where `g` is the sanitized group identifier. All seven slots must be
    /// present for every group; `{g}_confounds` is optional.
    pub fn build<S: AsRef<str>>(
        group_ids: &[S],
        fields: &HashMap<String, ArtifactRef>,
    ) -> Result<Self, DomainError> {
        let mut groups = Vec::with_capacity(group_ids.len());

        for raw in group_ids {
            let id = GroupId::new(raw)?;
            let resolved = ArtifactSlot::REQUIRED.map(|slot| fields.get(&slot.slot_name(&id)));
            let [
                Some(image),
                Some(bval),
                Some(bvec),
                Some(original_bvec),
                Some(original_image),
                Some(raw_concatenated_image),
                Some(b0_reference),
            ] = resolved
            else {
                let missing: Vec<String> = ArtifactSlot::REQUIRED
                    .iter()
                    .zip(resolved)
                    .filter(|(_, artifact)| artifact.is_none())
                    .map(|(slot, _)| slot.slot_name(&id))
                    .collect();
                return Err(DomainError::validation(
                    id.as_str(),
                    format!("missing required slot(s): {}", missing.join(", ")),
                ));
            };

            groups.push(AcquisitionGroup {
                image: image.clone(),
                bval: bval.clone(),
                bvec: bvec.clone(),
                original_bvec: original_bvec.clone(),
                original_image: original_image.clone(),
                raw_concatenated_image: raw_concatenated_image.clone(),
                b0_reference: b0_reference.clone(),
                confounds: fields.get(&format!("{}_{}", id, CONFOUNDS_SUFFIX)).cloned(),
                id,
            });
        }

        Self::from_groups(groups)
    }

    /// Wrap already-typed groups, checking the set-level invariants
    pub fn from_groups(groups: Vec<AcquisitionGroup>) -> Result<Self, DomainError> {
        if groups.is_empty() {
            return Err(DomainError::validation(
                "<groups>",
                "at least one acquisition group is required",
            ));
        }
        let mut seen = HashSet::new();
        for group in &groups {
            if !seen.insert(group.id.clone()) {
                return Err(DomainError::validation(
                    group.id.as_str(),
                    "duplicate group identifier after sanitization",
                ));
            }
        }
        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcquisitionGroup> {
        self.groups.iter()
    }

    pub fn groups(&self) -> &[AcquisitionGroup] {
        &self.groups
    }

    pub fn ids(&self) -> Vec<&GroupId> {
        self.groups.iter().map(|g| &g.id).collect()
    }

    pub fn get(&self, id: &GroupId) -> Option<&AcquisitionGroup> {
        self.groups.iter().find(|g| &g.id == id)
    }

    /// The values of one slot across all groups, in group order
    pub fn field_values(&self, slot: ArtifactSlot) -> Vec<&ArtifactRef> {
        self.groups.iter().map(|g| g.artifact(slot)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots_for(ids: &[&str]) -> HashMap<String, ArtifactRef> {
        let mut fields = HashMap::new();
        for raw in ids {
            let id = GroupId::new(raw).unwrap();
            for slot in ArtifactSlot::REQUIRED {
                let name = slot.slot_name(&id);
                fields.insert(name.clone(), ArtifactRef::new(format!("/in/{name}")));
            }
        }
        fields
    }

    #[test]
    fn test_build_resolves_all_slots() {
        let fields = slots_for(&["dir-AP", "dir-PA"]);
        let set = AcquisitionGroupSet::build(&["dir-AP", "dir-PA"], &fields).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.ids()[0].as_str(), "dir_AP");
        let group = &set.groups()[1];
        assert_eq!(group.original_bvec.to_string(), "/in/dir_PA_original_bvec");
        assert_eq!(group.b0_reference.to_string(), "/in/dir_PA_b0_ref");
        assert!(group.confounds.is_none());
    }

    #[test]
    fn test_field_values_follow_group_order() {
        let fields = slots_for(&["b", "a", "c"]);
        let set = AcquisitionGroupSet::build(&["b", "a", "c"], &fields).unwrap();
        let bvals: Vec<String> = set
            .field_values(ArtifactSlot::Bval)
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(bvals, vec!["/in/b_bval", "/in/a_bval", "/in/c_bval"]);
    }

    #[test]
    fn test_missing_slot_names_group() {
        let mut fields = slots_for(&["dir-AP", "dir-PA"]);
        fields.remove("dir_PA_original_bvec");
        let err = AcquisitionGroupSet::build(&["dir-AP", "dir-PA"], &fields).unwrap_err();
        match err {
            DomainError::Validation { subject, message } => {
                assert_eq!(subject, "dir_PA");
                assert!(message.contains("dir_PA_original_bvec"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_every_missing_slot_is_listed_in_order() {
        let mut fields = slots_for(&["run1"]);
        fields.remove("run1_b0_ref");
        fields.remove("run1_image");
        let err = AcquisitionGroupSet::build(&["run1"], &fields).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("run1", "missing required slot(s): run1_image, run1_b0_ref")
        );
    }

    #[test]
    fn test_duplicate_after_sanitization() {
        let fields = slots_for(&["run-1"]);
        let err = AcquisitionGroupSet::build(&["run-1", "run_1"], &fields).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_empty_set_rejected() {
        let ids: [&str; 0] = [];
        assert!(AcquisitionGroupSet::build(&ids, &HashMap::new()).is_err());
    }

    #[test]
    fn test_optional_confounds_slot() {
        let mut fields = slots_for(&["run1"]);
        fields.insert(
            "run1_confounds".to_string(),
            ArtifactRef::new("/in/run1_confounds.tsv"),
        );
        let set = AcquisitionGroupSet::build(&["run1"], &fields).unwrap();
        assert!(set.groups()[0].confounds.is_some());
    }
}
