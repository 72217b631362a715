use indicatif::MultiProgress;

/// Print a line above the progress bars, or straight to stdout when the bars
/// are not being drawn (piped output, tests).
pub fn log_line(m: &MultiProgress, line: impl AsRef<str>) -> std::io::Result<()> {
    if m.is_hidden() {
        println!("{}", line.as_ref());
        Ok(())
    } else {
        m.println(line)
    }
}
