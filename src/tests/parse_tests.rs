use crate::parse::*;
use crate::process::AdmixError;

use std::io::{Cursor, Write};
use tempfile::NamedTempFile;

const WORKED_EXAMPLE: &str = "\
H 1.0 2.0
i1 0.0 0.0 Ref1
i2 1.0 0.0 Ref1
i3 9.0 0.0 Ref2
i4 11.0 0.0 Ref2
i5 5.0 0.0 Admix
i6 5.0 0.0 Admix
";

fn read_str(content: &str) -> Result<EigenvectorListing, AdmixError> {
    read_eigenvectors(Cursor::new(content.as_bytes()), "test")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_eigenvectors_groups_by_last_token() {
        let listing = read_str(WORKED_EXAMPLE).unwrap();

        assert_eq!(listing.meta.eig1, "1.0");
        assert_eq!(listing.meta.eig2, "2.0");
        assert_eq!(listing.groups.len(), 3);
        assert_eq!(
            listing.groups.labels().collect::<Vec<_>>(),
            vec!["Ref1", "Ref2", "Admix"]
        );

        let ref2 = listing.groups.get("Ref2").unwrap();
        assert_eq!(ref2.len(), 2);
        assert_eq!(ref2.coordinates[0].pc1, "9.0");
        assert_eq!(ref2.coordinates[1].pc1, "11.0");
        assert_eq!(ref2.coordinates[1].line_number, 5);
    }

    #[test]
    fn test_read_eigenvectors_ignores_extra_pcs() {
        let content = "\
#eigvals: 12.345 6.789 3.210 1.000
NA001:NA001 0.0123 -0.0456 0.9 0.8 0.7 YRI
NA002:NA002 0.0222 -0.0111 0.1 0.2 0.3 CEU
NA003:NA003 0.0333 0.0444 0.5 CEU
";
        let listing = read_str(content).unwrap();
        assert_eq!(listing.meta.eig1, "12.345");
        assert_eq!(listing.meta.eig2, "6.789");

        let ceu = listing.groups.get("CEU").unwrap();
        assert_eq!(ceu.len(), 2);
        assert_eq!(ceu.coordinates[0].pc1, "0.0222");
        assert_eq!(ceu.coordinates[0].pc2, "-0.0111");
        assert_eq!(ceu.coordinates[1].pc2, "0.0444");

        let coords = ceu.numeric_coordinates().unwrap();
        assert_eq!(coords[1], Coordinate { pc1: 0.0333, pc2: 0.0444 });
    }

    #[test]
    fn test_read_eigenvectors_preserves_insertion_order_within_group() {
        let content = "\
H 1 2
a 3.0 0 P
b 1.0 0 Q
c 2.0 0 P
d 1.0 0 P
";
        let listing = read_str(content).unwrap();
        let p: Vec<&str> = listing
            .groups
            .get("P")
            .unwrap()
            .coordinates
            .iter()
            .map(|c| c.pc1.as_str())
            .collect();
        assert_eq!(p, vec!["3.0", "2.0", "1.0"]);
    }

    #[test]
    fn test_read_eigenvectors_missing_header() {
        match read_str("") {
            Err(AdmixError::MissingHeader { path }) => assert_eq!(path, "test"),
            other => panic!("expected MissingHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_read_eigenvectors_malformed_line() {
        let content = "H 1.0 2.0\ni1 0.0 0.0 Ref1\ni2 1.0\n";
        match read_str(content) {
            Err(AdmixError::MalformedInputLine { line, tokens, content }) => {
                assert_eq!(line, 3);
                assert_eq!(tokens, 2);
                assert_eq!(content, "i2 1.0");
            }
            other => panic!("expected MalformedInputLine, got {:?}", other),
        }

        // A short header cannot supply both eigenvalues
        assert!(matches!(
            read_str("H 1.0\n"),
            Err(AdmixError::MalformedInputLine { line: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_coordinate_reported_on_use() {
        let content = "H 1 2\na 0.5 0.1 P\nb oops 0.2 Q\n";
        let listing = read_str(content).unwrap();

        // Coordinates are only parsed when a group is consumed
        assert!(listing.groups.get("P").unwrap().numeric_coordinates().is_ok());
        match listing.groups.get("Q").unwrap().numeric_coordinates() {
            Err(AdmixError::InvalidCoordinate { label, line, value }) => {
                assert_eq!(label, "Q");
                assert_eq!(line, 3);
                assert_eq!(value, "oops");
            }
            other => panic!("expected InvalidCoordinate, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_coordinates_rejected() {
        let content = "\
H 1 2
a 9.0 0.1 P
b nan 0.2 P
c 1.0 inf Q
d -infinity 0.0 R
e 2.0 NaN S
";
        let listing = read_str(content).unwrap();

        for (label, line, value) in [
            ("P", 3, "nan"),
            ("Q", 4, "inf"),
            ("R", 5, "-infinity"),
            ("S", 6, "NaN"),
        ] {
            match listing.groups.get(label).unwrap().numeric_coordinates() {
                Err(AdmixError::InvalidCoordinate { label: l, line: n, value: v }) => {
                    assert_eq!(l, label);
                    assert_eq!(n, line);
                    assert_eq!(v, value);
                }
                other => panic!("expected InvalidCoordinate for {}, got {:?}", label, other),
            }
        }
    }

    #[test]
    fn test_load_eigenvectors_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(WORKED_EXAMPLE.as_bytes())?;

        let first = load_eigenvectors(file.path())?;
        let second = load_eigenvectors(file.path())?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_load_eigenvectors_gzipped() -> Result<(), Box<dyn std::error::Error>> {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sample.evec.gz");
        let mut encoder = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
        encoder.write_all(WORKED_EXAMPLE.as_bytes())?;
        encoder.finish()?;

        let listing = load_eigenvectors(&path)?;
        assert_eq!(listing, read_str(WORKED_EXAMPLE)?);
        Ok(())
    }

    #[test]
    fn test_get_or_create_and_lookup() {
        let mut groups = PopulationGroups::new();
        assert!(groups.is_empty());
        assert!(matches!(groups.get("X"), Err(AdmixError::UnknownLabel(ref l)) if l == "X"));
        // Failed lookups do not create groups
        assert!(!groups.contains("X"));

        groups.get_or_create("X").coordinates.push(RawCoordinate {
            line_number: 2,
            pc1: "1".to_string(),
            pc2: "2".to_string(),
        });
        groups.get_or_create("X").coordinates.push(RawCoordinate {
            line_number: 3,
            pc1: "3".to_string(),
            pc2: "4".to_string(),
        });
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("X").unwrap().len(), 2);
    }

    #[test]
    fn test_parse_partition() {
        let partition = parse_partition("Admix;Ref1,Ref2").unwrap();
        assert_eq!(partition.admixed, "Admix");
        assert_eq!(partition.reference_a, "Ref1");
        assert_eq!(partition.reference_b, "Ref2");
        assert_eq!(partition.labels(), ["Admix", "Ref1", "Ref2"]);

        let parsed: PopulationPartition = "Sim; YRI , CEU".parse().unwrap();
        assert_eq!(parsed.labels(), ["Sim", "YRI", "CEU"]);
    }

    #[test]
    fn test_parse_partition_arity_errors() {
        for spec in [
            "Admix",
            "Admix;Ref1",
            "Admix;Ref1,Ref2,Ref3",
            "Admix;Ref1,Ref2;Extra",
            "Admix,Ref1;Ref2",
            ";Ref1,Ref2",
            "Admix;Ref1,",
            "Admix;Ref1,Admix",
            "Admix;Ref1,Ref1",
        ] {
            match parse_partition(spec) {
                Err(AdmixError::InvalidPartitionSpec { spec: s, .. }) => assert_eq!(s, spec),
                other => panic!("expected InvalidPartitionSpec for '{}', got {:?}", spec, other),
            }
        }
    }
}
