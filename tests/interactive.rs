use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use futures::StreamExt;
use https_intercept::{
    CookieRecord, HandleOutcome, HttpsInterceptor, InterceptedRequest, MemoryCookieStore,
    ProtocolRegistry, VERSION,
};
use tokio::runtime::Runtime;

fn prompt(label: &str) -> io::Result<String> {
    print!("{} ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_usize(input: &str, default: usize) -> usize {
    input.trim().parse().ok().unwrap_or(default)
}

#[test]
#[ignore = "Requires network access and manual input"]
fn interactive_live_interception() -> Result<(), Box<dyn Error>> {
    println!("https-intercept {} interactive smoke test", VERSION);
    println!("Provide inputs when prompted. Press Enter to accept defaults.\n");

    let url_input = prompt(
        "Target URL [https://media.githubusercontent.com/media/git-lfs/git-lfs/main/docs/images/cli.png]:",
    )?;
    let target_url = if url_input.is_empty() {
        "https://media.githubusercontent.com/media/git-lfs/git-lfs/main/docs/images/cli.png"
            .to_string()
    } else {
        url_input
    };
    let session_answer = prompt("GitHub user_session cookie (blank for none):")?;
    let redirects_answer = prompt("Max redirects [10]:")?;

    let cookies = Arc::new(MemoryCookieStore::new());
    if !session_answer.is_empty() {
        cookies.insert(CookieRecord::new("user_session", session_answer, "github.com", true))?;
    }

    let interceptor = HttpsInterceptor::builder()
        .with_cookie_store(cookies)
        .with_max_redirects(parse_usize(&redirects_answer, 10))
        .build()?;
    let interceptor = Arc::new(interceptor);

    let mut registry = ProtocolRegistry::new();
    registry.register_https(interceptor.clone())?;

    let runtime = Runtime::new()?;
    println!("\nFetching {}...", target_url);
    let outcome = runtime
        .block_on(registry.route(InterceptedRequest::new("GET", target_url.as_str())))
        .ok_or("no handler registered for the target scheme")?;

    match outcome {
        HandleOutcome::Response(response) | HandleOutcome::Forwarded(response) => {
            println!("Status: {}", response.status_code);
            for (name, value) in response.headers.iter() {
                println!("  {}: {}", name, value.to_str().unwrap_or("<binary>"));
            }
            let mut stream = response.data;
            let total = runtime.block_on(async {
                let mut total = 0usize;
                while let Some(chunk) = stream.next().await {
                    total += chunk?.len();
                }
                Ok::<_, https_intercept::TransportError>(total)
            })?;
            println!("Body: {} bytes streamed", total);
        }
        HandleOutcome::Abort(reason) => println!("Aborted: {}", reason),
    }

    if let Some(snapshot) = interceptor.metrics() {
        println!(
            "Metrics -> responses: {}, redirects: {}, aborts: {}, resolutions: {} ({} failed)",
            snapshot.global.responses,
            snapshot.global.redirects,
            snapshot.global.aborts,
            snapshot.global.resolutions,
            snapshot.global.failed_resolutions
        );
    }

    println!("Interactive test complete. Re-run with different inputs as needed.");
    Ok(())
}
