use crate::{error::Error, extent::Extent, progress::Progress};
use std::{
    fs,
    io::ErrorKind,
    path::Path,
    process::Command,
};
use tracing::{info, warn};

const BREAKPOINT: &str = "-- breakpoint";

/// Runs the extraction template against the external query engine, one
/// subprocess per template section. A failing section is logged and skipped;
/// a missing query binary aborts the run.
pub fn run(
    template: &Path,
    data_dir: &Path,
    extent: &Extent,
    tool: &Path,
    progress: &dyn Progress,
) -> Result<(), Error> {
    let raw = fs::read_to_string(template).map_err(|source| Error::TemplateRead {
        path: template.to_path_buf(),
        source,
    })?;

    let script = substitute(&raw, data_dir, extent);

    let sections: Vec<&str> = script
        .split(BREAKPOINT)
        .map(str::trim)
        .filter(|section| !section.is_empty() && !section.starts_with("SET extent_"))
        .collect();

    info!(
        "running {} query sections from {}",
        sections.len(),
        template.display()
    );

    fs::create_dir_all(data_dir)?;

    for (index, section) in sections.iter().enumerate() {
        let output = Command::new(tool)
            .arg("-c")
            .arg(section)
            .output()
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    Error::ToolNotFound {
                        tool: tool.display().to_string(),
                    }
                } else {
                    Error::Io(error)
                }
            })?;

        if output.status.success() {
            info!("query section {} finished", index + 1);
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);

            warn!(
                "query section {} failed ({}): {}",
                index + 1,
                output.status,
                stderr.trim()
            );
        }

        progress.update(index + 1, sections.len());
    }

    Ok(())
}

/// Replaces the data-directory placeholder and the four extent variables the
/// template refers to.
fn substitute(raw: &str, data_dir: &Path, extent: &Extent) -> String {
    raw.replace("{{data_dir}}", &data_dir.display().to_string())
        .replace("$extent_xmin", &extent.xmin.to_string())
        .replace("$extent_ymin", &extent.ymin.to_string())
        .replace("$extent_xmax", &extent.xmax.to_string())
        .replace("$extent_ymax", &extent.ymax.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use std::{fs::File, io::Write as _, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn extent() -> Extent {
        "10,20,30,40".parse().unwrap()
    }

    /// A stand-in query tool that appends each `-c` argument to a log file.
    fn logging_tool(dir: &TempDir, log: &Path) -> std::path::PathBuf {
        let path = dir.path().join("query-tool");

        let mut file = File::create(&path).unwrap();

        writeln!(file, "#!/bin/sh\nprintf '%s\\n---\\n' \"$2\" >> {}", log.display()).unwrap();

        drop(file);

        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        path
    }

    #[test]
    fn sections_are_substituted_and_executed() {
        let dir = TempDir::new().unwrap();

        let template = dir.path().join("queries.template");

        fs::write(
            &template,
            "SET extent_xmin = $extent_xmin;\n\
             -- breakpoint\n\
             COPY a TO '{{data_dir}}/a.geojsonseq';\n\
             -- breakpoint\n\
             SELECT * WHERE x > $extent_xmin AND y < $extent_ymax;\n",
        )
        .unwrap();

        let log = dir.path().join("sections.log");
        let tool = logging_tool(&dir, &log);
        let data_dir = dir.path().join("data");

        run(&template, &data_dir, &extent(), &tool, &NullProgress).unwrap();

        let logged = fs::read_to_string(&log).unwrap();

        assert!(logged.contains(&format!("COPY a TO '{}/a.geojsonseq';", data_dir.display())));
        assert!(logged.contains("WHERE x > 10 AND y < 40"));
        // The extent SET stanza never reaches the tool.
        assert!(!logged.contains("SET extent_xmin"));
    }

    #[test]
    fn empty_sections_are_skipped() {
        let dir = TempDir::new().unwrap();

        let template = dir.path().join("queries.template");

        fs::write(
            &template,
            "-- breakpoint\n\n-- breakpoint\nSELECT 1;\n-- breakpoint\n",
        )
        .unwrap();

        let log = dir.path().join("sections.log");
        let tool = logging_tool(&dir, &log);

        run(
            &template,
            &dir.path().join("data"),
            &extent(),
            &tool,
            &NullProgress,
        )
        .unwrap();

        let logged = fs::read_to_string(&log).unwrap();

        assert_eq!(logged.matches("---").count(), 1);
    }

    #[test]
    fn failing_section_does_not_abort_the_run() {
        let dir = TempDir::new().unwrap();

        let template = dir.path().join("queries.template");

        fs::write(&template, "SELECT broken;\n-- breakpoint\nSELECT 1;\n").unwrap();

        let tool = dir.path().join("query-tool");

        let mut file = File::create(&tool).unwrap();

        writeln!(
            file,
            "#!/bin/sh\ncase \"$2\" in *broken*) echo boom >&2; exit 1;; esac\nexit 0"
        )
        .unwrap();

        drop(file);

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();

        let result = run(
            &template,
            &dir.path().join("data"),
            &extent(),
            &tool,
            &NullProgress,
        );

        assert!(result.is_ok());
    }

    #[test]
    fn missing_tool_is_fatal() {
        let dir = TempDir::new().unwrap();

        let template = dir.path().join("queries.template");

        fs::write(&template, "SELECT 1;\n").unwrap();

        let result = run(
            &template,
            &dir.path().join("data"),
            &extent(),
            Path::new("/nonexistent/query-tool"),
            &NullProgress,
        );

        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }

    #[test]
    fn missing_template_is_reported() {
        let dir = TempDir::new().unwrap();

        let result = run(
            &dir.path().join("missing.template"),
            &dir.path().join("data"),
            &extent(),
            Path::new("query-tool"),
            &NullProgress,
        );

        assert!(matches!(result, Err(Error::TemplateRead { .. })));
    }
}
