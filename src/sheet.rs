//! Excel training-index loading.
//!
//! One workbook, two schemas: `Plagas` holds one pest per row, `Deficiencias`
//! interleaves disorder header rows with characteristic detail rows. Column
//! headers sit on the second row of both sheets.

use crate::error::{DatasetError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::Path;
use tracing::{error, warn};

pub const SHEET_PLAGAS: &str = "Plagas";
pub const SHEET_DEFICIENCIAS: &str = "Deficiencias";

/// Row index of the column headers (0-based).
const HEADER_ROW: usize = 1;

const DEFAULT_AFFECTED_PART: &str = "plant body";
const DEFAULT_AFFECTED_SPECIES: &str = "citrus plant";
const DEFAULT_DAMAGE: &str = "damage";

#[derive(Debug, Clone)]
pub struct PestRecord {
    pub disease_type: String,
    pub sub_type: String,
    pub common_name: String,
    pub scientific_name: String,
    pub affected_part: String,
    pub affected_species: String,
    pub damage: String,
}

#[derive(Debug, Clone)]
pub struct DeficiencyRecord {
    /// Inherited from the most recent header row of the block.
    pub disorder: String,
    pub characteristic: String,
    pub affected_part: String,
}

#[derive(Debug, Clone)]
pub enum Record {
    Pest(PestRecord),
    Deficiency(DeficiencyRecord),
}

impl Record {
    /// Keyword mapping consumed by the query templates.
    pub fn keywords(&self) -> Vec<(&'static str, String)> {
        match self {
            Record::Pest(p) => vec![
                ("Tipo", p.disease_type.clone()),
                ("Subtipo", p.sub_type.clone()),
                ("nombre_común", p.common_name.clone()),
                ("Nombre Científico", p.scientific_name.clone()),
                ("parte_afectada", p.affected_part.clone()),
                ("especies_afectadas", p.affected_species.clone()),
                ("Daño", p.damage.clone()),
            ],
            Record::Deficiency(d) => vec![
                ("disorder", d.disorder.clone()),
                ("characteristic", d.characteristic.clone()),
                ("affected_part", d.affected_part.clone()),
            ],
        }
    }

    /// Local image folder and file-name stem under `Images/`.
    pub fn file_stem(&self) -> &str {
        match self {
            Record::Pest(p) => &p.scientific_name,
            Record::Deficiency(d) => &d.disorder,
        }
    }

    /// Drive folder name: pests group by type, deficiencies by disorder.
    pub fn drive_category(&self) -> &str {
        match self {
            Record::Pest(p) => &p.disease_type,
            Record::Deficiency(d) => &d.disorder,
        }
    }
}

/// Load and preprocess one sheet of the training index.
///
/// Returns `Ok(None)` when the workbook file does not exist (logged, not
/// fatal). An unrecognized sheet name is a configuration mistake and errors.
pub fn load_records(path: &Path, sheet: &str) -> Result<Option<Vec<Record>>> {
    if sheet != SHEET_PLAGAS && sheet != SHEET_DEFICIENCIAS {
        return Err(DatasetError::UnknownSheet(sheet.to_string()));
    }
    if !path.exists() {
        error!("file {} not found", path.display());
        return Ok(None);
    }

    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range(sheet)?;

    let records = if sheet == SHEET_PLAGAS {
        pest_records(&range)?
    } else {
        deficiency_records(&range)?
    };
    Ok(Some(records))
}

fn pest_records(range: &Range<Data>) -> Result<Vec<Record>> {
    let tipo = column_index(range, SHEET_PLAGAS, "Tipo")?;
    let subtipo = column_index(range, SHEET_PLAGAS, "Subtipo")?;
    let common = column_index(range, SHEET_PLAGAS, "Nombre Común")?;
    let scientific = column_index(range, SHEET_PLAGAS, "Nombre Científico")?;
    let part = column_index(range, SHEET_PLAGAS, "Parte Afectada")?;
    let species = column_index(range, SHEET_PLAGAS, "Especie Afectada")?;
    let damage = column_index(range, SHEET_PLAGAS, "Daño")?;

    let mut records = Vec::new();
    for row in range.rows().skip(HEADER_ROW + 1) {
        let Some(scientific_name) = cell_text(row, scientific) else {
            // Spacer or incomplete row; nothing to search for.
            continue;
        };
        records.push(Record::Pest(PestRecord {
            disease_type: cell_text(row, tipo).unwrap_or_default(),
            sub_type: cell_text(row, subtipo).unwrap_or_default(),
            common_name: cell_text(row, common).unwrap_or_default(),
            scientific_name,
            affected_part: cell_text(row, part).unwrap_or_else(|| DEFAULT_AFFECTED_PART.into()),
            affected_species: cell_text(row, species)
                .unwrap_or_else(|| DEFAULT_AFFECTED_SPECIES.into()),
            damage: cell_text(row, damage).unwrap_or_else(|| DEFAULT_DAMAGE.into()),
        }));
    }
    Ok(records)
}

fn deficiency_records(range: &Range<Data>) -> Result<Vec<Record>> {
    // The first column has a merged-cell style label naming the disorder of
    // each block; only its header rows populate it.
    let disorder_col = 0;
    let characteristic = column_index(range, SHEET_DEFICIENCIAS, "Característica")?;
    let part = column_index(range, SHEET_DEFICIENCIAS, "Parte Afectada")?;

    let mut current_disorder: Option<String> = None;
    let mut records = Vec::new();
    for row in range.rows().skip(HEADER_ROW + 1) {
        match cell_text(row, characteristic) {
            None => {
                if let Some(disorder) = cell_text(row, disorder_col) {
                    current_disorder = Some(disorder);
                }
            }
            Some(characteristic) => {
                let Some(disorder) = current_disorder.clone() else {
                    warn!("characteristic row '{characteristic}' precedes any disorder header; skipped");
                    continue;
                };
                records.push(Record::Deficiency(DeficiencyRecord {
                    disorder,
                    characteristic,
                    affected_part: cell_text(row, part)
                        .unwrap_or_else(|| DEFAULT_AFFECTED_PART.into()),
                }));
            }
        }
    }
    Ok(records)
}

fn column_index(range: &Range<Data>, sheet: &str, column: &str) -> Result<usize> {
    range
        .rows()
        .nth(HEADER_ROW)
        .and_then(|headers| {
            headers
                .iter()
                .position(|cell| cell_to_text(cell).as_deref() == Some(column))
        })
        .ok_or_else(|| DatasetError::MissingColumn {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })
}

fn cell_text(row: &[Data], idx: usize) -> Option<String> {
    row.get(idx).and_then(cell_to_text)
}

fn cell_to_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range_from(rows: &[&[&str]]) -> Range<Data> {
        let height = rows.len() as u32;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32;
        let mut range = Range::new((0, 0), (height.saturating_sub(1), width.saturating_sub(1)));
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String((*value).to_string()));
                }
            }
        }
        range
    }

    const PEST_HEADERS: &[&str] = &[
        "Tipo",
        "Subtipo",
        "Nombre Común",
        "Nombre Científico",
        "Parte Afectada",
        "Especie Afectada",
        "Daño",
    ];

    #[test]
    fn test_pest_row_defaults_applied() {
        let range = range_from(&[
            &["", "", "", "", "", "", ""],
            PEST_HEADERS,
            &["Insecto", "Pulgones", "pulgón", "Aphis citricola", "", "", ""],
        ]);
        let records = pest_records(&range).unwrap();
        assert_eq!(records.len(), 1);
        let Record::Pest(pest) = &records[0] else {
            panic!("expected pest record");
        };
        assert_eq!(pest.scientific_name, "Aphis citricola");
        assert_eq!(pest.affected_part, "plant body");
        assert_eq!(pest.affected_species, "citrus plant");
        assert_eq!(pest.damage, "damage");
    }

    #[test]
    fn test_pest_row_without_scientific_name_skipped() {
        let range = range_from(&[
            &[""],
            PEST_HEADERS,
            &["Insecto", "Pulgones", "pulgón", "", "", "", ""],
        ]);
        assert!(pest_records(&range).unwrap().is_empty());
    }

    #[test]
    fn test_pest_missing_column_errors() {
        let range = range_from(&[&[""], &["Tipo", "Subtipo"], &["Insecto", "Pulgones"]]);
        let err = pest_records(&range).unwrap_err();
        assert!(err.to_string().contains("Nombre Común"));
    }

    #[test]
    fn test_deficiency_disorder_carry_forward() {
        let range = range_from(&[
            &[""],
            &["Deficiencias", "Característica", "Parte Afectada"],
            &["Deficiencia de Hierro", "", ""],
            &["", "clorosis intervenal", "hojas jóvenes"],
            &["", "hojas pálidas", "hojas"],
            &["Deficiencia de Zinc", "", ""],
            &["", "hojas pequeñas", "brotes"],
        ]);
        let records = deficiency_records(&range).unwrap();
        assert_eq!(records.len(), 3);
        let disorders: Vec<&str> = records.iter().map(|r| r.file_stem()).collect();
        assert_eq!(
            disorders,
            vec![
                "Deficiencia de Hierro",
                "Deficiencia de Hierro",
                "Deficiencia de Zinc"
            ]
        );
    }

    #[test]
    fn test_deficiency_detail_before_header_skipped() {
        let range = range_from(&[
            &[""],
            &["Deficiencias", "Característica", "Parte Afectada"],
            &["", "clorosis", "hojas"],
        ]);
        assert!(deficiency_records(&range).unwrap().is_empty());
    }

    #[test]
    fn test_deficiency_affected_part_default() {
        let range = range_from(&[
            &[""],
            &["Deficiencias", "Característica", "Parte Afectada"],
            &["Deficiencia de Hierro", "", ""],
            &["", "clorosis", ""],
        ]);
        let records = deficiency_records(&range).unwrap();
        let Record::Deficiency(d) = &records[0] else {
            panic!("expected deficiency record");
        };
        assert_eq!(d.affected_part, "plant body");
    }

    #[test]
    fn test_load_records_missing_file_is_none() {
        let result = load_records(Path::new("/nonexistent/index.xlsx"), SHEET_PLAGAS).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_records_unknown_sheet_errors() {
        let result = load_records(Path::new("/nonexistent/index.xlsx"), "Malezas");
        assert!(matches!(result, Err(DatasetError::UnknownSheet(_))));
    }

    #[test]
    fn test_keywords_for_pest_record() {
        let record = Record::Pest(PestRecord {
            disease_type: "Insecto".into(),
            sub_type: "Pulgones".into(),
            common_name: "pulgón".into(),
            scientific_name: "Aphis citricola".into(),
            affected_part: "plant body".into(),
            affected_species: "citrus plant".into(),
            damage: "damage".into(),
        });
        let keywords = record.keywords();
        assert_eq!(keywords.len(), 7);
        assert!(keywords
            .iter()
            .any(|(k, v)| *k == "nombre_común" && v == "pulgón"));
        assert!(keywords
            .iter()
            .any(|(k, v)| *k == "Nombre Científico" && v == "Aphis citricola"));
    }
}
