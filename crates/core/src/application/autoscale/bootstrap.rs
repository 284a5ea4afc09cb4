// Bootstrap script handed to each new jury instance.

/// Init script installing a systemd service that runs the jury container.
/// The script is the only channel through which a jury ever receives its
/// credentials.
const USER_DATA_TEMPLATE: &str = r#"#!/bin/bash

cat > /etc/systemd/system/docker-jury.service <<EOF
[Unit]
Description=Jury container
Requires=docker.service
After=docker.service

[Service]
Restart=always
ExecStart=/usr/bin/docker run --cap-add=SYS_PTRACE -e JUDGE_URL={judge_url} -e JUDGE_API_KEY={api_key} easyctf/openctf-jury:latest
ExecStop=:

[Install]
WantedBy=default.target
EOF

systemctl daemon-reload
systemctl enable docker-jury
systemctl start docker-jury
"#;

/// Render the jury bootstrap script for one instance.
pub fn bootstrap_script(judge_url: &str, api_key: &str) -> String {
    USER_DATA_TEMPLATE
        .replace("{judge_url}", judge_url)
        .replace("{api_key}", api_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_carries_url_and_credential() {
        let script = bootstrap_script("https://judge.example.com", "deadbeef");
        assert!(script.contains("JUDGE_URL=https://judge.example.com"));
        assert!(script.contains("JUDGE_API_KEY=deadbeef"));
        assert!(script.contains("--cap-add=SYS_PTRACE"));
        assert!(script.contains("easyctf/openctf-jury:latest"));
        assert!(!script.contains("{judge_url}"));
        assert!(!script.contains("{api_key}"));
    }
}
