use anyhow::{Context as AnyhowContext, Result};
use sourcekit::{ExecContext, Interpreter, Literal, S3Presigner, S3Source};

use crate::manifest;
use crate::ui;
use crate::Context;

pub fn run(ctx: &Context, literal: &str, sign: bool, expires: Option<u64>) -> Result<()> {
    let parsed = manifest::parse_literal(literal)?;
    let interpreter = Interpreter::default();
    let mut source = interpreter.interpret_literal(&parsed)?;

    if sign {
        let exec = ExecContext::new();
        source = match expires {
            Some(secs) => {
                let s3 = S3Source::parse(literal)
                    .context("--expires applies to s3://, tar+s3:// and jar+s3:// sources")?;
                let presigner = S3Presigner::resolve(&exec)?;
                Box::new(s3.sign_with(&presigner, secs)?)
            }
            None => source.sign(&exec)?,
        };
    }

    if ctx.quiet {
        println!("{}", render(&source.externalize())?);
        return Ok(());
    }

    ui::card(
        &source.describe(),
        &[
            ("Kind", source.kind().name().to_string()),
            (
                "Inline",
                if source.kind().is_inline() { "yes" } else { "no" }.to_string(),
            ),
            ("Literal", render(&source.externalize())?),
        ],
    );
    Ok(())
}

fn render(literal: &Literal) -> Result<String> {
    Ok(match literal {
        Literal::Str(url) => url.clone(),
        other => serde_json::to_string(other)?,
    })
}
