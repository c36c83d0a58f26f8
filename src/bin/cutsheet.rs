use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cutsheet::{ColorSpace, SheetError, SheetRenderer};

#[derive(Parser, Debug)]
#[command(name = "cutsheet", version, about = "Render a packed layout onto a 330x480mm PDF sheet")]
struct Cli {
    /// Request JSON (`arrangements`, `designFiles`, `outputPath`).
    payload: Option<String>,

    /// Read the request JSON from a file, or `-` for stdin.
    #[arg(long, conflicts_with = "payload")]
    input: Option<PathBuf>,

    /// Write placement events as JSONL to this file.
    #[arg(long)]
    debug_log: Option<PathBuf>,

    /// Output color space for drawn colors: `rgb` or `cmyk`.
    #[arg(long, value_name = "SPACE", default_value = "rgb")]
    color_space: ColorSpace,

    /// Shorthand for `--color-space cmyk`.
    #[arg(long, conflicts_with = "color_space")]
    cmyk: bool,

    /// Rasterization resolution for SVG assets.
    #[arg(long, default_value_t = cutsheet::DEFAULT_SVG_DPI)]
    svg_dpi: u32,
}

impl Cli {
    fn effective_color_space(&self) -> ColorSpace {
        if self.cmyk {
            ColorSpace::Cmyk
        } else {
            self.color_space
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let result = run(&cli);
    println!("{}", status_line(&result));
    ExitCode::from(exit_status(&result))
}

fn run(cli: &Cli) -> Result<PathBuf, SheetError> {
    let payload = read_payload(cli, std::io::stdin())?;

    let mut builder = SheetRenderer::builder()
        .svg_raster_dpi(cli.svg_dpi)
        .color_space(cli.effective_color_space());
    if let Some(path) = &cli.debug_log {
        builder = builder.debug_log(path);
    }
    let renderer = builder.build()?;

    let metrics = renderer.render_json(&payload)?;
    log::info!(
        "{} placements: {} embedded, {} fallback, {} missing record, {} skipped",
        metrics.placements,
        metrics.embedded,
        metrics.fallbacks,
        metrics.misses,
        metrics.skipped
    );
    Ok(metrics.output_path)
}

fn read_payload(cli: &Cli, mut stdin: impl Read) -> Result<String, SheetError> {
    match (&cli.payload, &cli.input) {
        (Some(payload), _) => Ok(payload.clone()),
        (None, Some(path)) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            stdin.read_to_string(&mut buf)?;
            Ok(buf)
        }
        (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
        (None, None) => Err(SheetError::InvalidRequest(
            "JSON data required".to_string(),
        )),
    }
}

fn status_line(result: &Result<PathBuf, SheetError>) -> String {
    match result {
        Ok(path) => format!("SUCCESS: PDF created at {}", path.display()),
        Err(err) => format!("ERROR: {err}"),
    }
}

fn exit_status(result: &Result<PathBuf, SheetError>) -> u8 {
    if result.is_ok() { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "cutsheet_cli_{}_{}_{}.{}",
            tag,
            std::process::id(),
            nanos,
            ext
        ))
    }

    fn empty_sheet_payload(out: &std::path::Path) -> String {
        serde_json::json!({
            "arrangements": [],
            "designFiles": [],
            "outputPath": out.to_string_lossy(),
        })
        .to_string()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cutsheet").chain(args.iter().copied()))
            .expect("parse args")
    }

    #[test]
    fn positional_payload_is_used_verbatim() {
        let cli = parse(&["{\"a\":1}"]);
        let payload = read_payload(&cli, std::io::empty()).expect("payload");
        assert_eq!(payload, "{\"a\":1}");
    }

    #[test]
    fn input_file_is_read() {
        let path = temp_path("input", "json");
        std::fs::write(&path, "{\"from\":\"file\"}").expect("write input");
        let cli = parse(&["--input", path.to_str().expect("utf8 path")]);
        let payload = read_payload(&cli, std::io::empty());
        let _ = std::fs::remove_file(&path);
        assert_eq!(payload.expect("payload"), "{\"from\":\"file\"}");
    }

    #[test]
    fn dash_input_reads_stdin() {
        let cli = parse(&["--input", "-"]);
        let payload = read_payload(&cli, "{\"from\":\"stdin\"}".as_bytes()).expect("payload");
        assert_eq!(payload, "{\"from\":\"stdin\"}");
    }

    #[test]
    fn missing_input_file_is_an_io_error() {
        let cli = parse(&["--input", "/definitely/not/here.json"]);
        let err = read_payload(&cli, std::io::empty()).expect_err("missing");
        assert!(matches!(err, SheetError::Io(_)));
    }

    #[test]
    fn no_payload_requires_json() {
        let cli = parse(&[]);
        let err = read_payload(&cli, std::io::empty()).expect_err("no payload");
        assert!(err.to_string().contains("JSON data required"));
        assert_eq!(exit_status(&Err(err)), 1);
    }

    #[test]
    fn payload_and_input_conflict() {
        let parsed = Cli::try_parse_from(["cutsheet", "{}", "--input", "req.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn color_space_flag_and_cmyk_shorthand() {
        assert_eq!(parse(&[]).effective_color_space(), ColorSpace::Rgb);
        assert_eq!(
            parse(&["--color-space", "CMYK"]).effective_color_space(),
            ColorSpace::Cmyk
        );
        assert_eq!(parse(&["--cmyk"]).effective_color_space(), ColorSpace::Cmyk);
        assert!(Cli::try_parse_from(["cutsheet", "--color-space", "lab"]).is_err());
        assert!(
            Cli::try_parse_from(["cutsheet", "--cmyk", "--color-space", "rgb"]).is_err()
        );
    }

    #[test]
    fn run_writes_pdf_and_reports_success() {
        let out = temp_path("run", "pdf");
        let payload = empty_sheet_payload(&out);
        let cli = parse(&[payload.as_str(), "--color-space", "cmyk"]);
        let result = run(&cli);
        let bytes = std::fs::read(&out).expect("read output");
        let _ = std::fs::remove_file(&out);

        assert_eq!(result.as_ref().expect("run"), &out);
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(
            status_line(&result),
            format!("SUCCESS: PDF created at {}", out.display())
        );
        assert_eq!(exit_status(&result), 0);
    }

    #[test]
    fn run_rejects_invalid_payload() {
        let cli = parse(&["{not json"]);
        let result = run(&cli);
        assert!(matches!(result, Err(SheetError::Json(_))));
        assert!(status_line(&result).starts_with("ERROR: "));
        assert_eq!(exit_status(&result), 1);
    }

    #[test]
    fn run_rejects_zero_dpi() {
        let out = temp_path("dpi", "pdf");
        let payload = empty_sheet_payload(&out);
        let cli = parse(&[payload.as_str(), "--svg-dpi", "0"]);
        let result = run(&cli);
        assert!(matches!(result, Err(SheetError::InvalidConfiguration(_))));
        assert!(!out.exists());
    }
}
