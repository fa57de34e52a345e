//! Class rosters stored as CSV, JSON or YAML files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use super::{list_files, StudentRepository};
use crate::error::RepositoryError;
use crate::model::Student;

const NAME_COLUMN: &str = "student_name";
const ID_COLUMN: &str = "student_id";

/// Splits CSV content into records of fields. Fields may be double-quoted,
/// with `""` standing for a literal quote; quoted fields may span lines.
/// Blank lines are dropped.
fn split_records(content: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    let mut end_record = |fields: &mut Vec<String>, field: &mut String| {
        fields.push(std::mem::take(field));
        let record = std::mem::take(fields);
        if !(record.len() == 1 && record[0].trim().is_empty()) {
            records.push(record);
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => end_record(&mut fields, &mut field),
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !fields.is_empty() {
        end_record(&mut fields, &mut field);
    }
    records
}

fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Parses a roster CSV with a header row naming `student_name` and
/// `student_id` (any order, extra columns ignored). Rows missing either
/// field are skipped with a warning.
pub fn parse_roster_csv(content: &str, source: &str) -> Result<Vec<Student>, RepositoryError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut records = split_records(content).into_iter();

    let header = records.next().ok_or_else(|| RepositoryError::ParseError {
        path: source.to_string(),
        message: "missing header row".to_string(),
    })?;
    let columns: Vec<String> = header.iter().map(|c| c.trim().to_string()).collect();
    let position = |name: &str| {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| RepositoryError::ParseError {
                path: source.to_string(),
                message: format!("missing '{}' column", name),
            })
    };
    let name_idx = position(NAME_COLUMN)?;
    let id_idx = position(ID_COLUMN)?;

    let mut students = Vec::new();
    for (row, fields) in records.enumerate() {
        match (fields.get(name_idx), fields.get(id_idx)) {
            (Some(name), Some(id)) => students.push(Student::new(name.trim(), id.trim())),
            _ => warn!(source, row = row + 2, "Missing field in CSV row"),
        }
    }
    Ok(students)
}

/// Serializes a roster as CSV with a `student_name,student_id` header.
pub fn write_roster_csv(students: &[Student]) -> String {
    let mut out = format!("{},{}\n", NAME_COLUMN, ID_COLUMN);
    for s in students {
        out.push_str(&quote_field(&s.student_name));
        out.push(',');
        out.push_str(&quote_field(&s.student_id));
        out.push('\n');
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RosterFormat {
    Csv,
    Json,
    Yaml,
}

impl RosterFormat {
    fn from_path(path: &Path) -> Result<Self, RepositoryError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(RosterFormat::Csv),
            "json" => Ok(RosterFormat::Json),
            "yaml" | "yml" => Ok(RosterFormat::Yaml),
            _ => Err(RepositoryError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Rosters in a directory, in CSV, JSON or YAML form.
#[derive(Debug, Clone)]
pub struct FileStudentRepository {
    rosters_dir: PathBuf,
}

impl FileStudentRepository {
    pub fn new(rosters_dir: impl Into<PathBuf>) -> Self {
        Self {
            rosters_dir: rosters_dir.into(),
        }
    }

    /// Resolves a roster reference: absolute paths are used as-is, relative
    /// ones are looked up in the rosters directory first and then relative to
    /// the current directory.
    pub fn resolve(&self, reference: &str) -> PathBuf {
        let path = Path::new(reference);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let in_dir = self.rosters_dir.join(path);
        if in_dir.exists() {
            in_dir
        } else {
            path.to_path_buf()
        }
    }

    pub async fn load_file(&self, path: &Path) -> Result<Vec<Student>, RepositoryError> {
        let format = RosterFormat::from_path(path)?;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let students = match format {
            RosterFormat::Csv => parse_roster_csv(&content, &path.display().to_string())?,
            RosterFormat::Json => serde_json::from_str(&content)?,
            RosterFormat::Yaml => serde_yaml::from_str(&content)?,
        };
        info!(path = %path.display(), count = students.len(), "Loaded roster");
        Ok(students)
    }
}

#[async_trait]
impl StudentRepository for FileStudentRepository {
    async fn load_roster(&self, reference: &str) -> Result<Vec<Student>, RepositoryError> {
        self.load_file(&self.resolve(reference)).await
    }

    async fn save_roster(&self, students: &[Student], path: &Path) -> Result<(), RepositoryError> {
        let content = match RosterFormat::from_path(path)? {
            RosterFormat::Csv => write_roster_csv(students),
            RosterFormat::Json => serde_json::to_string_pretty(students)?,
            RosterFormat::Yaml => serde_yaml::to_string(students)?,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        info!(path = %path.display(), count = students.len(), "Saved roster");
        Ok(())
    }

    async fn available_rosters(&self) -> Result<Vec<String>, RepositoryError> {
        let files = list_files(&self.rosters_dir, &["csv", "json", "yaml", "yml"]).await?;
        Ok(files
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_csv_with_quotes_and_reordered_columns() {
        let csv = "\u{feff}student_id,student_name,email\n\
                   2023001,\"Silva, João\",j@x\n\
                   \n\
                   2023002,\"Maria \"\"Mari\"\" Santos\"\n\
                   2023003\n";
        let students = parse_roster_csv(csv, "class.csv").expect("parse");

        assert_eq!(
            students,
            vec![
                Student::new("Silva, João", "2023001"),
                Student::new("Maria \"Mari\" Santos", "2023002"),
            ]
        );
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let err = parse_roster_csv("name,id\nAna,1\n", "bad.csv").unwrap_err();
        assert!(err.to_string().contains("student_name"));
        assert!(parse_roster_csv("", "empty.csv").is_err());
    }

    #[test]
    fn test_write_csv_quotes_when_needed() {
        let out = write_roster_csv(&[Student::new("Silva, João", "1"), Student::new("Ana", "2")]);
        assert_eq!(out, "student_name,student_id\n\"Silva, João\",1\nAna,2\n");
        let back = parse_roster_csv(&out, "mem").expect("parse");
        assert_eq!(back[0].student_name, "Silva, João");
    }

    #[test]
    fn test_multiline_name_survives_write_and_parse() {
        let students = vec![Student::new("Ana\nSouza", "1"), Student::new("Bruno", "2")];

        let out = write_roster_csv(&students);
        let back = parse_roster_csv(&out, "mem").expect("parse");

        assert_eq!(back, students);
    }

    #[test]
    fn test_parse_crlf_line_endings() {
        let csv = "student_name,student_id\r\n\"Lima,\r\nCarla\",3\r\nDiego,4\r\n";
        let students = parse_roster_csv(csv, "win.csv").expect("parse");

        assert_eq!(
            students,
            vec![Student::new("Lima,\r\nCarla", "3"), Student::new("Diego", "4")]
        );
    }

    #[tokio::test]
    async fn test_load_formats_and_list() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("a.csv"), "student_name,student_id\nAna,1\n").expect("write");
        std::fs::write(
            dir.path().join("b.json"),
            r#"[{"student_name": "Bruno", "student_id": "2"}]"#,
        )
        .expect("write");
        std::fs::write(dir.path().join("c.yaml"), "- student_name: Carla\n  student_id: '3'\n")
            .expect("write");
        std::fs::write(dir.path().join("d.txt"), "ignored").expect("write");

        let repo = FileStudentRepository::new(dir.path());

        assert_eq!(repo.load_roster("a.csv").await.expect("csv")[0].student_name, "Ana");
        assert_eq!(repo.load_roster("b.json").await.expect("json")[0].student_id, "2");
        assert_eq!(repo.load_roster("c.yaml").await.expect("yaml")[0].student_name, "Carla");
        assert_eq!(
            repo.available_rosters().await.expect("list"),
            vec!["a.csv", "b.json", "c.yaml"]
        );
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = TempDir::new().expect("tempdir");
        let repo = FileStudentRepository::new(dir.path());

        assert!(matches!(
            repo.load_roster("missing.csv").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.load_roster("roster.xlsx").await,
            Err(RepositoryError::UnsupportedFormat(_))
        ));
    }

    #[tokio::test]
    async fn test_save_roster_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let repo = FileStudentRepository::new(dir.path());
        let students = vec![Student::new("Ana Souza", "1"), Student::new("Bruno", "2")];
        let path = dir.path().join("nested").join("class.csv");

        repo.save_roster(&students, &path).await.expect("save");
        let loaded = repo.load_file(&path).await.expect("load");

        assert_eq!(loaded, students);
    }
}
