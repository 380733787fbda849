use std::process::Command;

fn main() {
    // git version for the startup banner
    let git_hash = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .unwrap_or_default();

    println!("cargo:rustc-env=GIT_HASH={}", git_hash.trim());

    // non-wav audio goes through ffmpeg when the local whisper engine is used
    if std::env::var("CARGO_FEATURE_WHISPER").is_ok() {
        let ffmpeg_check = Command::new("ffmpeg").arg("-version").output();
        if ffmpeg_check.is_err() {
            println!("cargo:warning=ffmpeg not found in PATH, only wav recordings can be transcribed locally");
        }
    }
}
