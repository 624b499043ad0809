/// Outcome of one named case.
pub struct CaseResult {
    pub name: &'static str,
    pub error: Option<String>,
}

impl CaseResult {
    pub fn new(name: &'static str, result: anyhow::Result<()>) -> Self {
        Self {
            name,
            error: result.err().map(|e| format!("{e:#}")),
        }
    }
}

/// Print every case and fail if any of them did.
pub fn finish(title: &str, cases: Vec<CaseResult>) -> anyhow::Result<()> {
    println!("=== {title} ===");

    let total = cases.len();
    let mut passed = 0;
    for case in &cases {
        match &case.error {
            None => {
                println!("  PASS  {}", case.name);
                passed += 1;
            }
            Some(e) => println!("  FAIL  {}: {e}", case.name),
        }
    }

    println!();
    println!("{passed}/{total} passed");

    if passed < total {
        anyhow::bail!("{} {title} test(s) failed", total - passed);
    }
    Ok(())
}
