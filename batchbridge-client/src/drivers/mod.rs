//! Backend drivers
//!
//! Concrete bindings for remote schedulers reachable over REST.

mod nersc;
mod slurm_rest;

pub use nersc::NerscDriver;
pub use slurm_rest::SlurmRestDriver;

use batchbridge_core::JobSpec;
use serde_json::Value;

/// Reads a job id that schedulers send either as a number or as a string
pub(crate) fn native_id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

/// Builds a batch script for `spec`
///
/// An inline script is used verbatim; a path is wrapped in a `/bin/sh` script
/// that execs it with its arguments.
pub(crate) fn batch_script(spec: &JobSpec) -> String {
    compose_script(spec, &[], &[])
}

/// Builds a batch script that carries the whole specification for `sbatch`
///
/// Resources, wall time, name and directory become `#SBATCH` directives
/// placed right after the shebang, and the environment becomes `export`
/// lines placed after the leading comment block. Directives already present
/// in an inline script come later and take precedence.
pub(crate) fn sbatch_script(spec: &JobSpec) -> String {
    compose_script(spec, &sbatch_directives(spec), &env_exports(spec))
}

fn sbatch_directives(spec: &JobSpec) -> Vec<String> {
    let resources = &spec.resources;
    let mut directives = Vec::new();

    if let Some(name) = &spec.name {
        directives.push(format!("#SBATCH --job-name={}", name));
    }
    directives.push(format!("#SBATCH --nodes={}", resources.node_count.max(1)));
    if let Some(ppn) = resources.processes_per_node {
        directives.push(format!("#SBATCH --ntasks-per-node={}", ppn));
    }
    if let Some(gpus) = resources.gpus_per_node {
        directives.push(format!("#SBATCH --gpus-per-node={}", gpus));
    }
    directives.push(format!("#SBATCH --time={}", spec.duration_minutes()));
    if let Some(directory) = &spec.directory {
        directives.push(format!("#SBATCH --chdir={}", directory.display()));
    }

    directives
}

fn env_exports(spec: &JobSpec) -> Vec<String> {
    spec.environment
        .iter()
        .map(|(key, value)| format!("export {}={}", key, shell_quote(value)))
        .collect()
}

fn compose_script(spec: &JobSpec, directives: &[String], exports: &[String]) -> String {
    let body = if spec.is_inline_script() {
        spec.executable.trim_start().to_string()
    } else {
        let mut command = shell_quote(&spec.executable);
        for arg in &spec.arguments {
            command.push(' ');
            command.push_str(&shell_quote(arg));
        }
        format!("#!/bin/sh\nexec {}\n", command)
    };

    if directives.is_empty() && exports.is_empty() {
        return body;
    }

    let mut lines = body.lines();
    let shebang = lines.next().unwrap_or("#!/bin/sh");
    let rest: Vec<&str> = lines.collect();

    // sbatch stops reading directives at the first command line
    let header_len = rest
        .iter()
        .take_while(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#')
        })
        .count();

    let mut script = vec![shebang.to_string()];
    script.extend(directives.iter().cloned());
    script.extend(rest[..header_len].iter().map(|l| l.to_string()));
    script.extend(exports.iter().cloned());
    script.extend(rest[header_len..].iter().map(|l| l.to_string()));

    let mut joined = script.join("\n");
    joined.push('\n');
    joined
}

/// Quotes `s` for a POSIX shell
pub(crate) fn shell_quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+=:,@%".contains(c));
    if safe {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_native_id_from_value() {
        assert_eq!(native_id_from_value(&json!(12345)), Some("12345".into()));
        assert_eq!(native_id_from_value(&json!(" 77 ")), Some("77".into()));
        assert_eq!(native_id_from_value(&json!("")), None);
        assert_eq!(native_id_from_value(&json!(null)), None);
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/bin/echo"), "/bin/echo");
        assert_eq!(shell_quote("hello world"), "'hello world'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_batch_script_wraps_path() {
        let spec = JobSpec::new("/bin/echo").with_argument("a b");
        assert_eq!(batch_script(&spec), "#!/bin/sh\nexec /bin/echo 'a b'\n");
    }

    #[test]
    fn test_sbatch_script_carries_spec() {
        let spec = JobSpec::new("/bin/hostname")
            .with_name("n")
            .with_directory("/scratch")
            .with_env("A", "1")
            .with_env("B", "x y")
            .with_node_count(4)
            .with_duration(std::time::Duration::from_secs(7200));

        assert_eq!(
            sbatch_script(&spec),
            "#!/bin/sh\n\
             #SBATCH --job-name=n\n\
             #SBATCH --nodes=4\n\
             #SBATCH --time=120\n\
             #SBATCH --chdir=/scratch\n\
             export A=1\n\
             export B='x y'\n\
             exec /bin/hostname\n"
        );
    }

    #[test]
    fn test_sbatch_script_gpus_and_tasks() {
        let mut spec = JobSpec::new("/bin/true");
        spec.resources.processes_per_node = Some(8);
        spec.resources.gpus_per_node = Some(4);

        let script = sbatch_script(&spec);

        assert!(script.contains("#SBATCH --ntasks-per-node=8\n"));
        assert!(script.contains("#SBATCH --gpus-per-node=4\n"));
    }

    #[test]
    fn test_sbatch_script_zero_nodes_sent_as_one() {
        let mut spec = JobSpec::new("/bin/true");
        spec.resources.node_count = 0;
        assert!(sbatch_script(&spec).contains("#SBATCH --nodes=1\n"));
    }

    #[test]
    fn test_sbatch_script_keeps_inline_directives_after_ours() {
        let spec = JobSpec::new("#!/bin/bash\n#SBATCH -q debug\n\nsrun hostname\n").with_env("A", "1");

        assert_eq!(
            sbatch_script(&spec),
            "#!/bin/bash\n\
             #SBATCH --nodes=1\n\
             #SBATCH --time=10\n\
             #SBATCH -q debug\n\
             \n\
             export A=1\n\
             srun hostname\n"
        );
    }

    #[test]
    fn test_batch_script_keeps_inline_script() {
        let spec = JobSpec::new("#!/bin/bash\nhostname\n");
        assert_eq!(batch_script(&spec), "#!/bin/bash\nhostname\n");
    }
}
