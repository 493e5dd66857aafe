//! CLI tool for formatting Word documents, extracting text and checking
//! spelling and grammar.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use docmorph_core::presets::DEFAULT_PRESET_DIR;
use docmorph_core::{
    bullets_from_text, Alignment, CaptionPosition, DictionaryCorrector, FigureRequest,
    HeaderFooterAlignment, ImageAsset, Issue, Margins, PresetStore, Session, StrategyKind,
    StyleConfig, SuggestionChecker,
};
use docmorph_docx::{export_document, OUTPUT_FILENAME};
use docmorph_extract::{detect_format, TextExtractor};
use std::fs;
use std::path::{Path, PathBuf};

/// Format Word documents, extract text and suggest corrections.
#[derive(Parser, Debug)]
#[command(name = "docmorph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding style presets
    #[arg(long, global = true, default_value = DEFAULT_PRESET_DIR)]
    presets_dir: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a style and extra content to a .docx file
    Format(FormatArgs),

    /// Print the normalized text of a PDF, DOCX, DOC or text file
    Extract {
        /// Input file
        input: PathBuf,

        /// Declared type (MIME type or pdf/docx/doc/txt); detected if omitted
        #[arg(long)]
        mime: Option<String>,
    },

    /// Suggest spelling and grammar corrections
    Check(CheckArgs),

    /// Manage saved style presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Args, Debug)]
struct FormatArgs {
    /// Base .docx document
    #[arg(required_unless_present = "blank", conflicts_with = "blank")]
    input: Option<PathBuf>,

    /// Start from an empty document instead of an input file
    #[arg(long)]
    blank: bool,

    /// Output file
    #[arg(short, long, default_value = OUTPUT_FILENAME)]
    output: PathBuf,

    /// Start from a saved preset instead of the default style
    #[arg(short, long)]
    preset: Option<String>,

    #[command(flatten)]
    style: StyleArgs,

    /// PNG or JPEG logo added to the header
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Section title appended as a Heading 1
    #[arg(long)]
    title: Option<String>,

    /// File with one bullet item per line
    #[arg(long, conflicts_with = "bullet")]
    bullets: Option<PathBuf>,

    /// Bullet item (repeatable)
    #[arg(long)]
    bullet: Vec<String>,

    /// PNG or JPEG figure appended at the end
    #[arg(long)]
    figure: Option<PathBuf>,

    /// Figure caption
    #[arg(long, requires = "figure")]
    caption: Option<String>,

    /// Caption placement: above or below
    #[arg(long, default_value = "below")]
    caption_position: String,

    /// Figure width in inches
    #[arg(long, default_value = "4.0")]
    figure_width: f64,

    /// Figure height in inches
    #[arg(long, default_value = "3.0")]
    figure_height: f64,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// File to check
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Text to check
    #[arg(short, long)]
    text: Option<String>,

    /// Declared type of the input file
    #[arg(long)]
    mime: Option<String>,

    /// Checking strategy: sentence or span
    #[arg(short, long, default_value = "sentence")]
    strategy: String,

    /// Maximum number of issues reported
    #[arg(long)]
    max_issues: Option<usize>,

    /// Number of characters of input checked
    #[arg(long)]
    max_chars: Option<usize>,

    /// Word-frequency dictionary (`word [count]` per line)
    #[arg(short, long)]
    dictionary: Option<PathBuf>,

    /// Print issues as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum PresetAction {
    /// List saved presets
    List,

    /// Print a preset as JSON
    Show { name: String },

    /// Save a preset built from the default style and the given flags
    Save {
        name: String,

        /// Start from an existing preset
        #[arg(long)]
        from: Option<String>,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Delete a preset
    Delete { name: String },
}

/// Style overrides shared by `format` and `preset save`.
#[derive(Args, Debug, Default)]
struct StyleArgs {
    /// Body font name
    #[arg(long)]
    font: Option<String>,

    /// Body font size in points
    #[arg(long)]
    font_size: Option<f64>,

    /// Line spacing multiple
    #[arg(long)]
    line_spacing: Option<f64>,

    /// Body alignment: left, center, right or justify
    #[arg(long)]
    alignment: Option<String>,

    /// Margin on every side, in inches
    #[arg(long)]
    margin: Option<f64>,

    #[arg(long)]
    margin_top: Option<f64>,

    #[arg(long)]
    margin_bottom: Option<f64>,

    #[arg(long)]
    margin_left: Option<f64>,

    #[arg(long)]
    margin_right: Option<f64>,

    /// Header text
    #[arg(long)]
    header: Option<String>,

    /// Footer text
    #[arg(long)]
    footer: Option<String>,

    /// Header/footer font size in points
    #[arg(long)]
    hf_size: Option<f64>,

    /// Header/footer alignment: left, center or right
    #[arg(long)]
    hf_align: Option<String>,

    /// Logo width in inches
    #[arg(long)]
    logo_width: Option<f64>,

    /// Logo height in inches
    #[arg(long)]
    logo_height: Option<f64>,
}

impl StyleArgs {
    /// Overlay the flags that were given onto `config`.
    fn apply(&self, config: &mut StyleConfig) {
        if let Some(font) = &self.font {
            config.font_name = font.clone();
        }
        if let Some(size) = self.font_size {
            config.font_size = size;
        }
        if let Some(spacing) = self.line_spacing {
            config.line_spacing = spacing;
        }
        if let Some(alignment) = &self.alignment {
            config.alignment = Alignment::from_name(alignment);
        }
        if let Some(margin) = self.margin {
            config.margins = Margins::uniform(margin);
        }
        let margins = &mut config.margins;
        for (flag, side) in [
            (self.margin_top, &mut margins.top),
            (self.margin_bottom, &mut margins.bottom),
            (self.margin_left, &mut margins.left),
            (self.margin_right, &mut margins.right),
        ] {
            if let Some(value) = flag {
                *side = value;
            }
        }
        if let Some(header) = &self.header {
            config.header_text = header.clone();
        }
        if let Some(footer) = &self.footer {
            config.footer_text = footer.clone();
        }
        if let Some(size) = self.hf_size {
            config.header_footer_size = size;
        }
        if let Some(align) = &self.hf_align {
            config.header_footer_alignment = HeaderFooterAlignment::from_name(align);
        }
        if let Some(width) = self.logo_width {
            config.logo_width = width;
        }
        if let Some(height) = self.logo_height {
            config.logo_height = height;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let store = PresetStore::new(&cli.presets_dir);

    match &cli.command {
        Command::Format(args) => run_format(args, &store, cli.verbose),
        Command::Extract { input, mime } => {
            let text = extract_text(input, mime.as_deref())?;
            println!("{}", text);
            Ok(())
        }
        Command::Check(args) => run_check(args),
        Command::Preset { action } => run_preset(action, &store),
    }
}

/// Build the session, export it and write the result.
fn run_format(args: &FormatArgs, store: &PresetStore, verbose: bool) -> Result<()> {
    let session = build_session(args, store)?;

    let base = match &args.input {
        Some(path) => {
            Some(fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?)
        }
        None => None,
    };

    let output = export_document(&session, base.as_deref()).context("Formatting failed")?;

    fs::write(&args.output, output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    if verbose {
        eprintln!("Written to: {}", args.output.display());
    }
    Ok(())
}

fn build_session(args: &FormatArgs, store: &PresetStore) -> Result<Session> {
    let mut session = Session::default();

    if let Some(name) = &args.preset {
        let preset = store
            .load(name)
            .with_context(|| format!("Failed to load preset '{}'", name))?;
        match preset {
            Some(style) => session.apply_preset(style),
            None => bail!("No preset named '{}'", name),
        }
    }
    args.style.apply(&mut session.style);

    if let Some(path) = &args.logo {
        session.content.logo = Some(read_image(path)?);
    }

    session.content.section_title = args.title.clone().unwrap_or_default();

    session.content.bullets = match &args.bullets {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            bullets_from_text(&text)
        }
        None => args.bullet.clone(),
    };

    if let Some(path) = &args.figure {
        let figure = FigureRequest::new(read_image(path)?)
            .with_size(args.figure_width, args.figure_height)
            .with_caption(
                args.caption.clone().unwrap_or_default(),
                CaptionPosition::from_name(&args.caption_position),
            );
        session.content.figure = Some(figure);
    }

    Ok(session)
}

fn read_image(path: &Path) -> Result<ImageAsset> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut asset = ImageAsset::new(bytes);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        asset = asset.with_filename(name);
    }
    Ok(asset)
}

/// Extract text using the declared type, or detect the format from the file.
fn extract_text(input: &Path, mime: Option<&str>) -> Result<String> {
    let extractor = TextExtractor::new();

    let text = match mime {
        Some(mime) => {
            let bytes =
                fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
            extractor.extract(&bytes, mime)
        }
        None => extractor.extract_path(input),
    };

    text.with_context(|| format!("Failed to extract text from {}", input.display()))
}

fn run_check(args: &CheckArgs) -> Result<()> {
    let issues = collect_issues(args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        print_issues(&issues);
    }
    Ok(())
}

/// Check the text or file named by `args`. An unreadable or unsupported
/// file is reported and checked as empty text; a failing correction backend
/// is reported and yields no issues.
fn collect_issues(args: &CheckArgs) -> Result<Vec<Issue>> {
    let checker = build_checker(args)?;

    let text = match (&args.text, &args.input) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => {
            let bytes =
                fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
            let declared = match &args.mime {
                Some(mime) => mime.clone(),
                None => detect_format(&bytes, path)
                    .map_or_else(String::new, |format| format.mime().to_string()),
            };

            let (text, error) = TextExtractor::new().extract_or_empty(&bytes, &declared);
            if let Some(e) = error {
                log::warn!("Checking {} as empty text: {}", path.display(), e);
            }
            text
        }
        (None, None) => bail!("Nothing to check: give a file or --text"),
    };

    Ok(checker.check(&text))
}

fn build_checker(args: &CheckArgs) -> Result<SuggestionChecker> {
    let strategy = StrategyKind::from_name(&args.strategy)
        .with_context(|| format!("Unknown strategy '{}'", args.strategy))?;

    let mut corrector = DictionaryCorrector::new();
    if let Some(path) = &args.dictionary {
        corrector = corrector
            .with_dictionary_file(path)
            .with_context(|| format!("Failed to load dictionary {}", path.display()))?;
    }

    let mut checker = SuggestionChecker::new(strategy.build(), Box::new(corrector));
    if let Some(max) = args.max_issues {
        checker = checker.with_max_issues(max);
    }
    if let Some(max) = args.max_chars {
        checker = checker.with_max_input_chars(max);
    }
    Ok(checker)
}

fn print_issues(issues: &[Issue]) {
    if issues.is_empty() {
        println!("No issues found.");
        return;
    }

    for (i, issue) in issues.iter().enumerate() {
        println!("{}. [{}] {}", i + 1, issue.kind.label(), issue.original);
        println!("   Suggestion: {}", issue.suggestion);
        println!("   Context: {}", issue.context);
    }
}

fn run_preset(action: &PresetAction, store: &PresetStore) -> Result<()> {
    match action {
        PresetAction::List => {
            let names = store.list().context("Failed to list presets")?;
            if names.is_empty() {
                eprintln!("No presets in {}", store.dir().display());
            }
            for name in names {
                println!("{}", name);
            }
        }
        PresetAction::Show { name } => {
            let preset = store
                .load(name)
                .with_context(|| format!("Failed to load preset '{}'", name))?
                .with_context(|| format!("No preset named '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(&preset)?);
        }
        PresetAction::Save { name, from, style } => {
            let mut config = match from {
                Some(base) => store
                    .load(base)
                    .with_context(|| format!("Failed to load preset '{}'", base))?
                    .with_context(|| format!("No preset named '{}'", base))?,
                None => StyleConfig::default(),
            };
            style.apply(&mut config);
            store
                .save(name, &config)
                .with_context(|| format!("Failed to save preset '{}'", name))?;
            eprintln!("Saved preset '{}'", name);
        }
        PresetAction::Delete { name } => {
            store
                .delete(name)
                .with_context(|| format!("Failed to delete preset '{}'", name))?;
        }
    }
    Ok(())
}
