use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{builder::PossibleValuesParser, Args, Parser, Subcommand};

use gameforge_core_sdk::generate;
use gameforge_core_sdk::prelude::*;

/**
 * \brief CLI 程序入口：AI 生成或模板生成 HTML5 小游戏。
 */
#[derive(Parser, Debug)]
#[command(
    name = "gameforge",
    version,
    about = "HTML5 game generator (AI or built-in templates)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /** \brief 输出目录 */
    #[arg(short, long)]
    output: PathBuf,
    /** \brief 非空目录不询问直接覆盖 */
    #[arg(short, long, default_value_t = false)]
    force: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief 调用大模型按描述生成游戏。
     * \param prompt  游戏需求描述
     * \param model   模型名，决定使用哪个 Provider
     * \param api_key 显式 API Key，优先于环境变量
     */
    Ai {
        #[arg(short, long)]
        prompt: String,
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,
        #[arg(long)]
        api_key: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },

    /**
     * \brief 使用内置模板生成游戏。
     */
    Template {
        #[arg(short = 't', long = "type", value_parser = PossibleValuesParser::new(catalog::template_keys()))]
        kind: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        out: OutputArgs,
    },

    /**
     * \brief 列出内置模板。
     */
    List,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = GeneratorConfig::from_env();
    telemetry::configure(&config);

    let (outcome, output_dir) = match cli.command {
        Commands::List => {
            for t in catalog::templates() {
                println!("{:<10} {}", t.key, t.title);
            }
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Template { kind, title, out } => {
            let Some(output_dir) = prepare_output_dir(&out)? else {
                return Ok(ExitCode::SUCCESS);
            };
            let outcome = generate::generate_from_template(&kind, title.as_deref(), &output_dir)
                .map_err(with_hint)?;
            (outcome, output_dir)
        }
        Commands::Ai {
            prompt,
            model,
            api_key,
            out,
        } => {
            let Some(output_dir) = prepare_output_dir(&out)? else {
                return Ok(ExitCode::SUCCESS);
            };
            let (selection, credential) = ai_credential(&model, api_key, llm::process_env)?;

            println!(
                "Calling {} ({}) to generate the game...",
                selection.label(),
                model
            );
            let backend =
                HttpBackend::new(config.request_timeout).context("build http client failed")?;
            let request = GenerationRequest::ai(prompt, model).with_credential(credential);
            let outcome = Generator::new(backend)
                .generate(&request, &output_dir)
                .await
                .map_err(with_hint)?;
            (outcome, output_dir)
        }
    };

    Ok(ExitCode::from(report(&outcome, &output_dir)))
}

/**
 * \brief 联网前解析 Provider 与密钥，缺失时直接报错。
 */
fn ai_credential(
    model: &str,
    api_key: Option<String>,
    env: llm::EnvLookup,
) -> Result<(llm::ProviderSelection, Credential)> {
    let selection = llm::select_provider(model);
    let explicit = api_key.map(Credential::new);
    let credential =
        llm::resolve_credential(selection, explicit.as_ref(), env).map_err(with_hint)?;
    Ok((selection, credential))
}

/**
 * \brief 为核心库错误补充命令行层面的提示。
 */
fn with_hint(err: GenerateError) -> anyhow::Error {
    let hint = match &err {
        GenerateError::MissingCredential { .. } => {
            Some("pass --api-key or set the environment variable")
        }
        GenerateError::UnknownTemplate { .. } => Some("run `gameforge list` to see templates"),
        _ => None,
    };
    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}

/**
 * \brief 展开输出路径并确认覆盖；用户取消时返回 None。
 */
fn prepare_output_dir(out: &OutputArgs) -> Result<Option<PathBuf>> {
    let output_dir = expand_home(&out.output);
    if confirm_output_dir(&output_dir, out.force)? {
        Ok(Some(output_dir))
    } else {
        println!("Cancelled");
        Ok(None)
    }
}

/**
 * \brief 输出结果摘要并给出退出码：解析失败返回 2。
 */
fn report(outcome: &GenerationOutcome, output_dir: &Path) -> u8 {
    for item in outcome.written() {
        println!("✓ {}", item.path.display());
    }
    if let GenerationOutcome::Partial { missing, .. } = outcome {
        let names: Vec<_> = missing.iter().map(|k| k.file_name()).collect();
        println!("Warning: reply had no code for {}", names.join(", "));
    }
    if let GenerationOutcome::ExtractionFailed { diagnostic } = outcome {
        eprintln!("Warning: no HTML block found in the model reply");
        eprintln!("Raw reply saved to {}", diagnostic.display());
    }
    if !outcome.is_success() {
        return 2;
    }
    println!(
        "\nDone. Open {} in a browser to play.",
        output_dir.join(ArtifactKind::Markup.file_name()).display()
    );
    0
}

/**
 * \brief 展开 `~` 前缀；取不到主目录时原样返回。
 */
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/**
 * \brief 目录非空时确认是否覆盖；非交互环境自动继续。
 */
fn confirm_output_dir(dir: &Path, force: bool) -> Result<bool> {
    let non_empty = match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    };
    if !non_empty {
        return Ok(true);
    }
    println!("Warning: output directory '{}' is not empty", dir.display());
    if force {
        return Ok(true);
    }
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        println!("Non-interactive session, continuing...");
        return Ok(true);
    }
    print!("Continue and overwrite? (y/N): ");
    std::io::stdout().flush().ok();
    let mut answer = String::new();
    stdin
        .lock()
        .read_line(&mut answer)
        .context("read confirmation failed")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
