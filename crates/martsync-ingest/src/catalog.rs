//! Genomes and annotation tables known to martsync
//!
//! Each protein-domain kind is fetched per transcript as the attribute
//! triple `<kind>, <kind>_start, <kind>_end` and stored in the table
//! `<genome>_<kind>`.

use martsync_common::types::TableSpec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identifier field every domain table is filtered and keyed on
pub const TRANSCRIPT_ID_FIELD: &str = "ensembl_transcript_id";

const ENSEMBL_US_EAST_MART: &str = "http://useast.ensembl.org/biomart";

/// Reference genome builds with a BioMart dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Genome {
    #[default]
    GRCh38,
    GRCh37,
    GRCm38,
}

impl Genome {
    pub const ALL: [Genome; 3] = [Genome::GRCh38, Genome::GRCh37, Genome::GRCm38];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genome::GRCh38 => "GRCh38",
            Genome::GRCh37 => "GRCh37",
            Genome::GRCm38 => "GRCm38",
        }
    }

    pub fn dataset(&self) -> &'static str {
        match self {
            Genome::GRCh38 | Genome::GRCh37 => "hsapiens_gene_ensembl",
            Genome::GRCm38 => "mmusculus_gene_ensembl",
        }
    }

    pub fn default_mart_url(&self) -> &'static str {
        ENSEMBL_US_EAST_MART
    }
}

impl std::str::FromStr for Genome {
    type Err = martsync_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genome::ALL
            .into_iter()
            .find(|genome| genome.as_str() == s)
            .ok_or_else(|| {
                martsync_common::Error::Parse(format!(
                    "Unknown genome '{}' (expected GRCh38, GRCh37 or GRCm38)",
                    s
                ))
            })
    }
}

impl std::fmt::Display for Genome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Protein-domain annotation sources available from the Ensembl mart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    Pfam,
    Smart,
    Superfamily,
    Tigrfam,
    Pfscan,
    Tmhmm,
    Seg,
    Ncoils,
    Prints,
    Pirsf,
    Signalp,
}

impl DomainKind {
    pub const ALL: [DomainKind; 11] = [
        DomainKind::Pfam,
        DomainKind::Smart,
        DomainKind::Superfamily,
        DomainKind::Tigrfam,
        DomainKind::Pfscan,
        DomainKind::Tmhmm,
        DomainKind::Seg,
        DomainKind::Ncoils,
        DomainKind::Prints,
        DomainKind::Pirsf,
        DomainKind::Signalp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Pfam => "pfam",
            DomainKind::Smart => "smart",
            DomainKind::Superfamily => "superfamily",
            DomainKind::Tigrfam => "tigrfam",
            DomainKind::Pfscan => "pfscan",
            DomainKind::Tmhmm => "tmhmm",
            DomainKind::Seg => "seg",
            DomainKind::Ncoils => "ncoils",
            DomainKind::Prints => "prints",
            DomainKind::Pirsf => "pirsf",
            DomainKind::Signalp => "signalp",
        }
    }

    /// Mart attributes after the transcript id: id, start, end
    pub fn attributes(&self) -> [String; 3] {
        let kind = self.as_str();
        [
            kind.to_string(),
            format!("{}_start", kind),
            format!("{}_end", kind),
        ]
    }
}

impl std::str::FromStr for DomainKind {
    type Err = martsync_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        DomainKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| martsync_common::Error::Parse(format!("Unknown domain kind '{}'", s)))
    }
}

impl std::fmt::Display for DomainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one fetch cycle asks for and where it lands.
///
/// `attributes` always starts with `filter_field`, so every fetched row
/// begins with the identifier it was filtered on, and lines up with the
/// table's columns.
#[derive(Debug, Clone)]
pub struct AnnotationPlan {
    pub filter_field: Arc<str>,
    pub attributes: Arc<[String]>,
    pub table: TableSpec,
}

impl AnnotationPlan {
    /// A plan whose table columns are named after the attributes
    pub fn new(
        table_name: impl Into<String>,
        filter_field: &str,
        attributes: &[&str],
    ) -> martsync_common::Result<Self> {
        let mut columns: Vec<String> = vec![filter_field.to_string()];
        columns.extend(
            attributes
                .iter()
                .filter(|attribute| **attribute != filter_field)
                .map(|attribute| attribute.to_string()),
        );

        let table = TableSpec::new(table_name, columns.clone())?;

        Ok(Self {
            filter_field: Arc::from(filter_field),
            attributes: Arc::from(columns),
            table,
        })
    }

    /// Domain table for `genome`; rows without a domain id are placeholders.
    pub fn domain(genome: Genome, kind: DomainKind) -> martsync_common::Result<Self> {
        let attributes = kind.attributes();
        let attribute_refs: Vec<&str> = attributes.iter().map(String::as_str).collect();
        let mut plan = Self::new(
            format!("{}_{}", genome, kind),
            TRANSCRIPT_ID_FIELD,
            &attribute_refs,
        )?;
        plan.table = plan.table.require_column(1)?;
        Ok(plan)
    }

    /// Plans for every domain kind of a genome
    pub fn all_domains(genome: Genome) -> martsync_common::Result<Vec<Self>> {
        DomainKind::ALL
            .into_iter()
            .map(|kind| Self::domain(genome, kind))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_genome_parse_and_display() {
        assert_eq!("GRCm38".parse::<Genome>().unwrap(), Genome::GRCm38);
        assert_eq!(Genome::GRCh37.to_string(), "GRCh37");
        assert!("hg19".parse::<Genome>().is_err());
    }

    #[test]
    fn test_genome_datasets() {
        assert_eq!(Genome::GRCh38.dataset(), "hsapiens_gene_ensembl");
        assert_eq!(Genome::GRCh37.dataset(), "hsapiens_gene_ensembl");
        assert_eq!(Genome::GRCm38.dataset(), "mmusculus_gene_ensembl");
    }

    #[test]
    fn test_domain_kind_parse() {
        assert_eq!("PFAM".parse::<DomainKind>().unwrap(), DomainKind::Pfam);
        assert!("interpro".parse::<DomainKind>().is_err());
    }

    #[test]
    fn test_domain_plan_layout() {
        let plan = AnnotationPlan::domain(Genome::GRCh38, DomainKind::Pfam).unwrap();

        assert_eq!(plan.table.name().as_str(), "GRCh38_pfam");
        assert_eq!(&*plan.filter_field, "ensembl_transcript_id");
        assert_eq!(
            plan.attributes.to_vec(),
            vec!["ensembl_transcript_id", "pfam", "pfam_start", "pfam_end"]
        );
        assert_eq!(plan.table.arity(), 4);
        assert_eq!(plan.table.required_columns(), &[0, 1]);
    }

    #[test]
    fn test_plan_does_not_repeat_filter_field() {
        let plan = AnnotationPlan::new("t", "gene_id", &["gene_id", "name"]).unwrap();
        assert_eq!(plan.attributes.to_vec(), vec!["gene_id", "name"]);
        assert_eq!(plan.table.required_columns(), &[0]);
    }

    #[test]
    fn test_all_domains() {
        let plans = AnnotationPlan::all_domains(Genome::GRCm38).unwrap();
        assert_eq!(plans.len(), DomainKind::ALL.len());
        assert!(plans
            .iter()
            .all(|plan| plan.table.name().as_str().starts_with("GRCm38_")));
    }
}
