use crate::process::{AdmixError, Result};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use flate2::read::MultiGzDecoder;
use log::{debug, info};

/// Eigenvalues from the header line of an eigenvector listing. Display-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EigenAxisMeta {
    pub eig1: String,
    pub eig2: String,
}

/// One individual's projection as it appeared in the listing.
///
/// The coordinate strings are kept verbatim; they are only parsed for groups
/// the estimator actually consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCoordinate {
    pub line_number: usize,
    pub pc1: String,
    pub pc2: String,
}

/// Numeric (pc1, pc2) pair for a single individual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub pc1: f64,
    pub pc2: f64,
}

impl RawCoordinate {
    pub fn parse(&self, label: &str) -> Result<Coordinate> {
        // `nan` and `inf` parse as f64 but are not usable projections.
        let parse_axis = |value: &str| -> Result<f64> {
            value
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .ok_or_else(|| AdmixError::InvalidCoordinate {
                    label: label.to_string(),
                    line: self.line_number,
                    value: value.to_string(),
                })
        };
        Ok(Coordinate {
            pc1: parse_axis(&self.pc1)?,
            pc2: parse_axis(&self.pc2)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationGroup {
    pub label: String,
    pub coordinates: Vec<RawCoordinate>,
}

impl PopulationGroup {
    pub fn new(label: &str) -> Self {
        PopulationGroup {
            label: label.to_string(),
            coordinates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Parses every member's coordinates, in file order.
    pub fn numeric_coordinates(&self) -> Result<Vec<Coordinate>> {
        self.coordinates
            .iter()
            .map(|raw| raw.parse(&self.label))
            .collect()
    }
}

/// Label -> group mapping that remembers the order labels were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationGroups {
    groups: Vec<PopulationGroup>,
    index: HashMap<String, usize>,
}

impl PopulationGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the group for `label`, creating an empty one on first use.
    pub fn get_or_create(&mut self, label: &str) -> &mut PopulationGroup {
        let idx = match self.index.get(label) {
            Some(&idx) => idx,
            None => {
                self.groups.push(PopulationGroup::new(label));
                let idx = self.groups.len() - 1;
                self.index.insert(label.to_string(), idx);
                idx
            }
        };
        &mut self.groups[idx]
    }

    /// Lookup without side effects. A label that never appeared in the listing
    /// is an `UnknownLabel` error.
    pub fn get(&self, label: &str) -> Result<&PopulationGroup> {
        self.index
            .get(label)
            .map(|&idx| &self.groups[idx])
            .ok_or_else(|| AdmixError::UnknownLabel(label.to_string()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &PopulationGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Parsed contents of an eigenvector listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EigenvectorListing {
    pub meta: EigenAxisMeta,
    pub groups: PopulationGroups,
}

/// Opens a listing, transparently decompressing `.gz` files.
pub fn open_listing_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;

    if path.extension().and_then(|s| s.to_str()) == Some("gz") {
        let decoder = MultiGzDecoder::new(file);
        Ok(Box::new(BufReader::new(decoder)))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Loads an eigenvector listing (smartpca `.evec` layout) from disk.
pub fn load_eigenvectors(path: &Path) -> Result<EigenvectorListing> {
    info!("Loading eigenvectors from {}", path.display());
    let reader = open_listing_reader(path)?;
    let listing = read_eigenvectors(reader, &path.display().to_string())?;
    info!(
        "Loaded {} individuals in {} populations",
        listing.groups.iter().map(|g| g.len()).sum::<usize>(),
        listing.groups.len()
    );
    Ok(listing)
}

/// Parses an eigenvector listing from any buffered reader. `source` names the
/// input in error messages.
///
/// Line 1 carries the eigenvalues at token positions 2 and 3. Every other line
/// is `<id> <pc1> <pc2> [more PCs...] <label>`; the label is the last token.
pub fn read_eigenvectors<R: BufRead>(reader: R, source: &str) -> Result<EigenvectorListing> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(AdmixError::MissingHeader {
                path: source.to_string(),
            })
        }
    };
    let header_fields: Vec<&str> = header.split_whitespace().collect();
    if header_fields.len() < 3 {
        return Err(AdmixError::MalformedInputLine {
            line: 1,
            tokens: header_fields.len(),
            content: header.clone(),
        });
    }
    let meta = EigenAxisMeta {
        eig1: header_fields[1].to_string(),
        eig2: header_fields[2].to_string(),
    };
    debug!("Header eigenvalues: {} {}", meta.eig1, meta.eig2);

    let mut groups = PopulationGroups::new();
    for (idx, line_result) in lines.enumerate() {
        let line = line_result?;
        let line_number = idx + 2;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(AdmixError::MalformedInputLine {
                line: line_number,
                tokens: fields.len(),
                content: line.clone(),
            });
        }

        let label = fields[fields.len() - 1];
        groups.get_or_create(label).coordinates.push(RawCoordinate {
            line_number,
            pc1: fields[1].to_string(),
            pc2: fields[2].to_string(),
        });
    }

    Ok(EigenvectorListing { meta, groups })
}

/// The admixed population and its two references, as named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationPartition {
    pub admixed: String,
    pub reference_a: String,
    pub reference_b: String,
}

impl PopulationPartition {
    /// Labels in (admixed, refA, refB) order.
    pub fn labels(&self) -> [&str; 3] {
        [
            self.admixed.as_str(),
            self.reference_a.as_str(),
            self.reference_b.as_str(),
        ]
    }
}

impl std::str::FromStr for PopulationPartition {
    type Err = AdmixError;

    fn from_str(spec: &str) -> Result<Self> {
        parse_partition(spec)
    }
}

/// Parses `"Admixed;Ref1,Ref2"`.
///
/// Label existence is not checked here; an absent label surfaces as
/// `UnknownLabel` when the groups are looked up.
pub fn parse_partition(spec: &str) -> Result<PopulationPartition> {
    let invalid = |reason: &str| AdmixError::InvalidPartitionSpec {
        spec: spec.to_string(),
        reason: reason.to_string(),
    };

    let segments: Vec<&str> = spec.split(';').collect();
    if segments.len() != 2 {
        return Err(invalid(
            "expected exactly one ';' separating the admixed population from the references",
        ));
    }
    let references: Vec<&str> = segments[1].split(',').collect();
    if references.len() != 2 {
        return Err(invalid("expected exactly two reference populations separated by ','"));
    }

    let admixed = segments[0].trim();
    let reference_a = references[0].trim();
    let reference_b = references[1].trim();
    if admixed.is_empty() || reference_a.is_empty() || reference_b.is_empty() {
        return Err(invalid("population labels must not be empty"));
    }
    if admixed == reference_a || admixed == reference_b || reference_a == reference_b {
        return Err(invalid("population labels must be distinct"));
    }

    Ok(PopulationPartition {
        admixed: admixed.to_string(),
        reference_a: reference_a.to_string(),
        reference_b: reference_b.to_string(),
    })
}
