//! Initialize a new permitclean project

use anyhow::{Context, Result};
use permitclean_core::VendorTag;
use permitclean_core::config::PROJECT_FILE;
use std::fs;
use std::path::Path;

/// Files that differ between the two vendor layouts
struct Template {
    cleanse_matching: &'static str,
    catalog: &'static str,
    directives: &'static str,
    schema: &'static str,
    input: &'static str,
}

const VENDOR_A: Template = Template {
    cleanse_matching: "legacy",
    catalog: "\
col_group,col_names
kept_cols,Permit Number
kept_cols,Permit Description
kept_cols,Permit Issue Date
kept_cols,Permit Update Timestamp
kept_cols,State FIPS
kept_cols,Units
non_string,Units
merge,State Cd
merge,State FIPS
cleanse,Permit Number
cleanse,Permit Description
convert,Permit Issue Date
convert,Permit Update Timestamp
",
    directives: "\
new_col,condition_col,var_type,field_len,operation,descrp
Source,,str,,populate,CL
Permit Prefix,Permit Number,str,2,to_str,
Loaded At,,datetime,,starttime,
",
    schema: r#"{
  "type": "array",
  "items": {
    "type": "object",
    "required": ["Permit Number", "Permit Update Timestamp"],
    "properties": {
      "Permit Number": {"type": ["string", "null"]},
      "Permit Update Timestamp": {"type": "string"}
    }
  }
}
"#,
    input: "\
Permit Number,Permit Description,Permit Issue Date,Permit Update Timestamp,State FIPS,Units,Notes
BP 100, Re-Roof ,20210115,2021-01-15 09:30:00.000,6,1,a
BP 101,New Single Family,20210230,2021-02-28 10:00:00.000,48,2,b
,Solar Panels,,2021-03-01 11:15:00.000,1,n/a,c
",
};

const VENDOR_B: Template = Template {
    cleanse_matching: "any_of",
    catalog: "\
col_group,col_names
kept_cols,PMT_NUMBER
kept_cols,PMT_DESCRP
kept_cols,PMT_DATE
kept_cols,STATE_FIPS
kept_cols,PMT_UNITS
non_string,PMT_UNITS
merge,State Cd
merge,STATE_FIPS
cleanse,PMT_NUMBER
cleanse,PMT_DESCRP
convert,PMT_DATE
",
    directives: "\
new_col,condition_col,var_type,field_len,operation,descrp
SOURCE,,str,,populate,CM
PMT_PREFIX,PMT_NUMBER,str,2,to_str,
LOADED_AT,,datetime,,starttime,
",
    schema: r#"{
  "type": "array",
  "items": {
    "type": "object",
    "required": ["PMT_NUMBER"],
    "properties": {
      "PMT_NUMBER": {"type": ["string", "null"]}
    }
  }
}
"#,
    input: "\
PMT_NUMBER,PMT_DESCRP,PMT_DATE,STATE_FIPS,PMT_UNITS,NOTES
BP 100,Re-Roof,01/15/2021,6,1,a
BP 101,New Single Family,02/30/2021,48,2,b
,Solar Panels,03/01/2021,1,n/a,c
",
};

const REFERENCE: &str = "\
State Name,Region,State Abbvr,Division,State Cd
California,West,CA,9,06
Texas,South,TX,7,48
";

/// Run the init command
pub fn run(path: &str, name: Option<&str>, vendor: &str) -> Result<()> {
    let vendor: VendorTag = vendor.parse()?;
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            PROJECT_FILE
        );
    }

    tracing::info!("Creating new {} project: {}", vendor, project_name);

    let template = match vendor {
        VendorTag::VendorA => &VENDOR_A,
        VendorTag::VendorB => &VENDOR_B,
    };

    fs::create_dir_all(project_dir.join("config"))?;
    fs::create_dir_all(project_dir.join("schemas"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# permitclean project configuration
name: {project_name}
vendor: {vendor}
encoding: utf8

# legacy: only names containing "Number" are identifiers
# any_of: names containing "Number" or "NUMBER"
cleanse_matching: {matching}

schema: schemas/{vendor}.json
catalog: config/columnspecs.csv
directives: config/field_create.csv

reference:
  path: config/state_abbr.csv

validation:
  severity: warn

output: data/output.csv
"#,
        matching = template.cleanse_matching,
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;

    let files = [
        ("config/columnspecs.csv", template.catalog),
        ("config/field_create.csv", template.directives),
        ("config/state_abbr.csv", REFERENCE),
        ("data/input.csv", template.input),
    ];
    for (file, contents) in files {
        fs::write(project_dir.join(file), contents)
            .with_context(|| format!("Failed to write {}", file))?;
    }
    fs::write(
        project_dir.join(format!("schemas/{vendor}.json")),
        template.schema,
    )?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  permitclean validate --input data/input.csv   # Check configuration");
    tracing::info!("  permitclean run data/input.csv                # Normalize the sample");

    Ok(())
}
