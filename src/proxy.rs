//! Reverse-proxy site configuration and verification.
//!
//! The site definition is fully replaced on every run: delete the old pair,
//! write fresh, re-link, validate, and only then reload. Verification pairs
//! a local syntax re-check with an HTTP probe from the orchestrator machine,
//! which catches misrouting an on-host check cannot see.

use anyhow::Result;

use crate::ssh::Ssh;

/// Path of the managed site definition.
pub const SITE_AVAILABLE: &str = "/etc/nginx/sites-available/gantry";

/// Path of the enablement symlink.
pub const SITE_ENABLED: &str = "/etc/nginx/sites-enabled/gantry";

/// Render the server block proxying port 80 to `localhost:<port>`.
#[must_use]
pub fn render_site(port: u32) -> String {
    format!(
        r"server {{
    listen 80;
    server_name _;

    location / {{
        proxy_pass http://localhost:{port};
        proxy_set_header Host $host;
        proxy_set_header X-Real-IP $remote_addr;
        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;
        proxy_set_header X-Forwarded-Proto $scheme;
    }}
}}
"
    )
}

/// Replace the site definition and reload nginx.
///
/// Reload is gated on `nginx -t`: a configuration that fails validation is
/// never activated.
///
/// # Errors
///
/// Returns an error if any step fails; on validation failure the reload is
/// not attempted.
pub async fn configure(ssh: &impl Ssh, port: u32) -> Result<()> {
    let output = ssh
        .exec(&format!("sudo rm -f {SITE_AVAILABLE} {SITE_ENABLED}"))
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("removing the old site definition failed: {}", stderr.trim());
    }

    let output = ssh
        .exec_with_stdin(
            &format!("sudo tee {SITE_AVAILABLE} > /dev/null"),
            render_site(port).as_bytes(),
        )
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("writing the site definition failed: {}", stderr.trim());
    }

    let output = ssh
        .exec(&format!("sudo ln -s {SITE_AVAILABLE} {SITE_ENABLED}"))
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("enabling the site failed: {}", stderr.trim());
    }

    let output = ssh.exec("sudo nginx -t").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("nginx rejected the new configuration: {}", stderr.trim());
    }

    let output = ssh.exec("sudo systemctl reload nginx").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("reloading nginx failed: {}", stderr.trim());
    }

    Ok(())
}

/// External reachability probe, issued from the orchestrator machine.
pub trait HttpProbe {
    /// Fetch `url`, failing on connection errors and non-2xx answers.
    ///
    /// # Errors
    ///
    /// Returns an error describing the failure.
    fn probe(&self, url: &str) -> Result<()>;
}

/// Production probe using a blocking HTTP GET.
pub struct UreqProbe;

impl HttpProbe for UreqProbe {
    fn probe(&self, url: &str) -> Result<()> {
        let req = ureq::get(url).timeout(std::time::Duration::from_secs(10));
        match req.call() {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, _)) => {
                anyhow::bail!("{url} answered HTTP {code}")
            }
            Err(e) => anyhow::bail!("cannot reach {url}: {e}"),
        }
    }
}

/// Confirm the proxy is live: syntax re-check on the host, then an external
/// GET against the bare server address.
///
/// # Errors
///
/// Returns an error if either check fails.
pub async fn verify(ssh: &impl Ssh, probe: &impl HttpProbe, server: &str) -> Result<()> {
    let output = ssh.exec("sudo nginx -t").await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("nginx configuration re-check failed: {}", stderr.trim());
    }

    probe.probe(&format!("http://{server}/"))
}

// ── Unit tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::ssh::testing::{Call, ScriptedSsh};

    #[derive(Default)]
    struct RecordingProbe {
        urls: RefCell<Vec<String>>,
        fail: bool,
    }

    impl HttpProbe for RecordingProbe {
        fn probe(&self, url: &str) -> Result<()> {
            self.urls.borrow_mut().push(url.to_string());
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(())
        }
    }

    #[test]
    fn rendered_block_proxies_the_configured_port() {
        let block = render_site(8080);
        assert!(block.contains("listen 80;"));
        assert!(block.contains("server_name _;"));
        assert!(block.contains("proxy_pass http://localhost:8080;"));
        for header in [
            "proxy_set_header Host $host;",
            "proxy_set_header X-Real-IP $remote_addr;",
            "proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;",
            "proxy_set_header X-Forwarded-Proto $scheme;",
        ] {
            assert!(block.contains(header), "missing: {header}");
        }
        assert_eq!(block.matches("proxy_set_header").count(), 4);
    }

    #[tokio::test]
    async fn configure_deletes_before_writing() {
        let ssh = ScriptedSsh::new();
        configure(&ssh, 8080).await.expect("configure");

        let texts = ssh.call_texts();
        assert_eq!(texts.len(), 5);
        assert!(texts[0].starts_with("sudo rm -f"));
        assert!(texts[0].contains(SITE_AVAILABLE));
        assert!(texts[0].contains(SITE_ENABLED));
        assert!(texts[1].contains("sudo tee"));
        assert!(texts[2].contains("ln -s"));
        assert_eq!(texts[3], "sudo nginx -t");
        assert_eq!(texts[4], "sudo systemctl reload nginx");
    }

    #[tokio::test]
    async fn configure_writes_the_rendered_block() {
        let ssh = ScriptedSsh::new();
        configure(&ssh, 9001).await.expect("configure");

        let calls = ssh.calls.borrow();
        let Call::Stdin { input, .. } = &calls[1] else {
            panic!("expected the site write, got {:?}", calls[1]);
        };
        assert_eq!(input.as_slice(), render_site(9001).as_bytes());
    }

    #[tokio::test]
    async fn validation_failure_blocks_the_reload() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("nginx -t", "unexpected end of file");
        let err = configure(&ssh, 8080).await.expect_err("must fail");
        assert!(err.to_string().contains("nginx rejected"));

        let reloads = ssh
            .call_texts()
            .iter()
            .filter(|t| t.contains("reload"))
            .count();
        assert_eq!(reloads, 0, "reload must never run on a broken config");
    }

    #[tokio::test]
    async fn verify_probes_the_bare_server_address() {
        let ssh = ScriptedSsh::new();
        let probe = RecordingProbe::default();
        verify(&ssh, &probe, "203.0.113.7").await.expect("verify");
        assert_eq!(probe.urls.borrow().as_slice(), ["http://203.0.113.7/"]);
    }

    #[tokio::test]
    async fn verify_recheck_failure_skips_the_probe() {
        let mut ssh = ScriptedSsh::new();
        ssh.fail_matching("nginx -t", "broken include");
        let probe = RecordingProbe::default();
        let err = verify(&ssh, &probe, "203.0.113.7")
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("re-check failed"));
        assert!(probe.urls.borrow().is_empty());
    }

    #[tokio::test]
    async fn verify_surfaces_probe_failures() {
        let ssh = ScriptedSsh::new();
        let probe = RecordingProbe {
            fail: true,
            ..RecordingProbe::default()
        };
        let err = verify(&ssh, &probe, "203.0.113.7")
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("connection refused"));
    }
}
