use std::path::Path;

pub fn format_time(value: f64) -> String {
    format!("{value:.6}")
}

/// Escapes a path for use inside a single-quoted filter option.
pub fn escape_ffmpeg_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('\'', "'\\''")
        .replace(':', "\\:")
}

/// Renders an argument list as a copy-pasteable shell command.
pub fn format_command(program: &str, args: &[String]) -> String {
    shell_words::join(std::iter::once(program).chain(args.iter().map(String::as_str)))
}
