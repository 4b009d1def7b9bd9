//! Browser session management.
//!
//! One Chromium process + one CDP page connection per conversation, persisted
//! between action dispatches (daemon model) and closed explicitly when the
//! conversation is cleared.

use super::ax::{collect_semantic, AxElement};
use super::cdp::CdpClient;
use browserpilot_core::config::BrowserConfig;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// A live browser session: one Chromium process and one page connection.
pub struct BrowserSession {
    /// Conversation this session belongs to.
    pub name: String,
    /// Remote debugging port.
    pub debug_port: u16,
    /// Browser child process.
    process: Child,
    /// CDP WebSocket client connected to the page target.
    pub cdp: CdpClient,
    /// User data directory (per-conversation profile).
    pub user_data_dir: PathBuf,
    /// Current page URL, if a navigation has happened.
    pub current_url: Option<String>,
    /// Screenshot cache: name -> base64 PNG. Overwrite on same name,
    /// unbounded, dies with the session.
    pub shots: HashMap<String, String>,
    settle_delay: Duration,
    navigate_wait: Duration,
}

impl BrowserSession {
    /// Load a URL and wait for the page to settle.
    pub async fn goto(&mut self, url: &str) -> Result<(), String> {
        self.cdp.navigate(url).await?;
        tokio::time::sleep(self.navigate_wait).await;
        self.current_url = Some(url.to_string());
        Ok(())
    }

    /// Click the first element matching the selector. Zero matches is an
    /// error carrying the selector, not a silent no-op.
    pub async fn click(&mut self, selector: &str) -> Result<(), String> {
        let js = format!(
            concat!(
                "(function() {{ var el = document.querySelector('{}');",
                " if (!el) return false;",
                " el.scrollIntoView({{block: 'center'}});",
                " el.click(); return true; }})()"
            ),
            escape_js(selector)
        );

        let clicked = self.eval_bool(&js).await?;
        if !clicked {
            return Err(format!("no element matches '{}'", selector));
        }

        // Let page reactions (navigation, re-render) land before any
        // follow-up capture.
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// Set an input's value: focus the first match, clear it, insert the
    /// text via CDP, and notify framework listeners.
    pub async fn fill(&mut self, selector: &str, value: &str) -> Result<(), String> {
        let focus_js = format!(
            concat!(
                "(function() {{ var el = document.querySelector('{}');",
                " if (!el) return false;",
                " el.scrollIntoView({{block: 'center'}});",
                " el.focus(); return true; }})()"
            ),
            escape_js(selector)
        );

        let focused = self.eval_bool(&focus_js).await?;
        if !focused {
            return Err(format!("no element matches '{}'", selector));
        }

        self.cdp
            .evaluate_js(
                "document.activeElement && (document.activeElement.value = '', document.activeElement.textContent = '')",
            )
            .await?;
        self.cdp.insert_text(value).await?;
        self.cdp
            .evaluate_js(
                "document.activeElement && document.activeElement.dispatchEvent(new Event('input', {bubbles: true}))",
            )
            .await?;

        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// Visually outline the first element matching the selector.
    pub async fn highlight(&mut self, selector: &str) -> Result<(), String> {
        let js = format!(
            concat!(
                "(function() {{ var el = document.querySelector('{}');",
                " if (!el) return false;",
                " el.scrollIntoView({{block: 'center'}});",
                " el.style.outline = '2px solid red';",
                " el.style.outlineOffset = '2px'; return true; }})()"
            ),
            escape_js(selector)
        );

        let found = self.eval_bool(&js).await?;
        if !found {
            return Err(format!("no element matches '{}'", selector));
        }
        Ok(())
    }

    /// Capture the viewport or full scrollable page as base64 PNG.
    pub async fn screenshot(&mut self, full_page: bool) -> Result<String, String> {
        self.cdp.screenshot(full_page).await
    }

    /// Capture only the first element matching the selector, clipped to its
    /// box model.
    pub async fn screenshot_element(&mut self, selector: &str) -> Result<String, String> {
        let root = self.cdp.document_root().await?;
        let node_id = self
            .cdp
            .query_selector(root, selector)
            .await?
            .ok_or_else(|| format!("no element matches '{}'", selector))?;

        let box_model = self.cdp.get_box_model(node_id).await?;
        let (x, y, width, height) = rect_from_box_model(&box_model)
            .ok_or_else(|| format!("element '{}' has no box model", selector))?;

        self.cdp.screenshot_clip(x, y, width, height).await
    }

    /// Enumerate interactive elements from the accessibility tree, filtered
    /// to the semantic role set and an optional accessible-name substring.
    pub async fn interactive_elements(
        &mut self,
        text_filter: Option<&str>,
    ) -> Result<Vec<AxElement>, String> {
        let tree = self.cdp.get_accessibility_tree().await?;
        Ok(collect_semantic(&tree, text_filter))
    }

    async fn eval_bool(&self, js: &str) -> Result<bool, String> {
        let result = self.cdp.evaluate_js(js).await?;
        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    /// Close the browser session.
    pub async fn close(&mut self) {
        // Graceful close via CDP first, then kill the process.
        if let Err(e) = self
            .cdp
            .send_command("Browser.close", serde_json::json!({}))
            .await
        {
            debug!("CDP Browser.close failed (may already be closed): {}", e);
        }
        let _ = self.process.kill().await;
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort kill on drop
        let _ = self.process.start_kill();
    }
}

/// Extract a page-coordinate rect from a `DOM.getBoxModel` response.
/// The content quad is 8 numbers: x1,y1,x2,y2,x3,y3,x4,y4.
fn rect_from_box_model(box_model: &Value) -> Option<(f64, f64, f64, f64)> {
    let content = box_model
        .get("model")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())?;
    if content.len() < 8 {
        return None;
    }
    let xs: Vec<f64> = content.iter().step_by(2).filter_map(|v| v.as_f64()).collect();
    let ys: Vec<f64> = content
        .iter()
        .skip(1)
        .step_by(2)
        .filter_map(|v| v.as_f64())
        .collect();
    let min_x = xs.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_y = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_y = ys.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !min_x.is_finite() || !min_y.is_finite() || max_x <= min_x || max_y <= min_y {
        return None;
    }
    Some((min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Escape a string for embedding in a single-quoted JS literal.
fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Manages browser sessions keyed by conversation id.
pub struct SessionManager {
    sessions: HashMap<String, BrowserSession>,
    /// Base directory for per-conversation user data dirs.
    base_dir: PathBuf,
    config: BrowserConfig,
}

impl SessionManager {
    pub fn new(base_dir: PathBuf, config: BrowserConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            base_dir,
            config,
        }
    }

    /// Get the conversation's session, launching a browser on first use.
    pub async fn get_or_create(&mut self, name: &str) -> Result<&mut BrowserSession, String> {
        if !self.sessions.contains_key(name) {
            let session = self.launch_browser(name).await?;
            self.sessions.insert(name.to_string(), session);
        }
        Ok(self
            .sessions
            .get_mut(name)
            .expect("session inserted above"))
    }

    /// List conversations with a live browser.
    pub fn list_sessions(&self) -> Vec<&str> {
        self.sessions.keys().map(|s| s.as_str()).collect()
    }

    /// Close a conversation's browser, if any.
    pub async fn close_session(&mut self, name: &str) {
        if let Some(mut session) = self.sessions.remove(name) {
            session.close().await;
        }
    }

    /// Close all browsers.
    pub async fn close_all(&mut self) {
        let names: Vec<String> = self.sessions.keys().cloned().collect();
        for name in names {
            self.close_session(&name).await;
        }
    }

    /// Launch a browser instance and connect to its page target via CDP.
    async fn launch_browser(&self, name: &str) -> Result<BrowserSession, String> {
        let browser_path = match &self.config.binary {
            Some(path) => path.clone(),
            None => find_browser_binary()
                .ok_or_else(|| "Chrome/Chromium not found. Please install it.".to_string())?,
        };

        let safe_name = name.replace([':', '/', '\\'], "_");
        let user_data_dir = self.base_dir.join("sessions").join(&safe_name);
        std::fs::create_dir_all(&user_data_dir)
            .map_err(|e| format!("Failed to create user data dir: {}", e))?;

        let debug_port = find_free_port().await?;
        let args = build_chrome_args(debug_port, &user_data_dir, self.config.headless);

        info!(
            session = name,
            port = debug_port,
            headless = self.config.headless,
            "Launching browser for session"
        );

        let child = Command::new(&browser_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("Failed to launch {}: {}", browser_path, e))?;

        // Wait for the browser-level CDP endpoint, then connect to the page
        // target so Page.enable etc. work.
        wait_for_cdp_ready(debug_port, 15).await?;
        let page_ws_url = get_page_ws_url(debug_port).await?;

        let cdp = CdpClient::connect(
            &page_ws_url,
            Duration::from_secs(self.config.cdp_command_timeout_secs),
        )
        .await?;

        cdp.enable_domain("Page").await?;
        cdp.enable_domain("Runtime").await?;
        cdp.enable_domain("DOM").await?;
        cdp.enable_domain("Accessibility").await?;

        info!(session = name, ws_url = %page_ws_url, "CDP connection established (page target)");

        Ok(BrowserSession {
            name: name.to_string(),
            debug_port,
            process: child,
            cdp,
            user_data_dir,
            current_url: None,
            shots: HashMap::new(),
            settle_delay: Duration::from_millis(self.config.settle_delay_ms),
            navigate_wait: Duration::from_millis(self.config.navigate_wait_ms),
        })
    }
}

/// Build Chromium command line arguments.
fn build_chrome_args(debug_port: u16, user_data_dir: &std::path::Path, headless: bool) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", debug_port),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--metrics-recording-only".to_string(),
        "--password-store=basic".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    args.push("--window-size=1280,720".to_string());
    args.push("about:blank".to_string());
    args
}

/// Find a Chrome/Chromium binary on the system.
pub fn find_browser_binary() -> Option<String> {
    let candidates: Vec<&str> = if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
        ]
    } else if cfg!(target_os = "linux") {
        vec![
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
        ]
    } else {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ]
    };

    for candidate in candidates {
        if std::path::Path::new(candidate).exists() {
            return Some(candidate.to_string());
        }
        if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok()
        {
            return Some(candidate.to_string());
        }
    }
    None
}

/// Find a free TCP port.
async fn find_free_port() -> Result<u16, String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| format!("Failed to bind to find free port: {}", e))?;
    let port = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local addr: {}", e))?
        .port();
    drop(listener);
    Ok(port)
}

/// Poll the browser's /json/version endpoint until CDP is up.
async fn wait_for_cdp_ready(port: u16, timeout_secs: u64) -> Result<(), String> {
    let start = std::time::Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let url = format!("http://127.0.0.1:{}/json/version", port);

    loop {
        if start.elapsed() > timeout {
            return Err(format!(
                "Browser CDP not ready after {}s on port {}",
                timeout_secs, port
            ));
        }

        if let Ok(resp) = reqwest::get(&url).await {
            if let Ok(body) = resp.json::<Value>().await {
                if body.get("webSocketDebuggerUrl").is_some() {
                    return Ok(());
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Resolve the first page target's WebSocket URL via /json/list. Retries a
/// few times since the page target may not appear immediately.
async fn get_page_ws_url(port: u16) -> Result<String, String> {
    let url = format!("http://127.0.0.1:{}/json/list", port);

    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        let resp = match reqwest::get(&url).await {
            Ok(r) => r,
            Err(_) => continue,
        };
        let targets: Vec<Value> = match resp.json().await {
            Ok(t) => t,
            Err(_) => continue,
        };

        for target in &targets {
            if target.get("type").and_then(|v| v.as_str()) == Some("page") {
                if let Some(ws_url) = target.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    return Ok(ws_url.to_string());
                }
            }
        }
    }

    Err("No page target found after retries".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chrome_args_headless() {
        let args = build_chrome_args(9222, std::path::Path::new("/tmp/profile"), true);
        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert_eq!(args.last().map(|s| s.as_str()), Some("about:blank"));
    }

    #[test]
    fn test_chrome_args_headed() {
        let args = build_chrome_args(9222, std::path::Path::new("/tmp/profile"), false);
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
    }

    #[test]
    fn test_rect_from_box_model() {
        let box_model = json!({
            "model": {
                "content": [10.0, 20.0, 110.0, 20.0, 110.0, 60.0, 10.0, 60.0]
            }
        });
        let (x, y, w, h) = rect_from_box_model(&box_model).unwrap();
        assert!((x - 10.0).abs() < 0.01);
        assert!((y - 20.0).abs() < 0.01);
        assert!((w - 100.0).abs() < 0.01);
        assert!((h - 40.0).abs() < 0.01);
    }

    #[test]
    fn test_rect_from_box_model_degenerate() {
        assert!(rect_from_box_model(&json!({})).is_none());
        let zero = json!({"model": {"content": [5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0]}});
        assert!(rect_from_box_model(&zero).is_none());
    }

    #[test]
    fn test_escape_js() {
        assert_eq!(escape_js("#plain"), "#plain");
        assert_eq!(escape_js("a[name='x']"), "a[name=\\'x\\']");
        assert_eq!(escape_js("back\\slash"), "back\\\\slash");
    }
}
