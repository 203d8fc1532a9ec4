use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use paperscout_rs::cli::{Args, Command};
use paperscout_rs::workflow::{self, AppContext};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (command, config) = args.into_parts();

    let ctx = AppContext::new(config)?;

    // Ctrl+C触发协作式取消，运行在下一个阶段边界停止
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("🛑 收到中断信号，正在取消运行...");
            signal_token.cancel();
        }
    });

    match command {
        Command::Research { topic } => {
            ctx.check_connection().await?;
            let report = workflow::run_research(&ctx, &topic, cancel).await;
            println!("{}", report);
        }
        Command::Ask { question } => {
            let answer = workflow::ask_local_documents(&ctx, &question).await;
            println!("{}", answer);
        }
    }

    Ok(())
}
