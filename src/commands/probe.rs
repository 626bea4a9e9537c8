/// `depcache probe` command implementation
use anyhow::Result;

use crate::cli::ProbeArgs;
use depcache::toolchain::{runtime_candidates, runtime_link_flags, ToolchainEnv};

pub fn run(args: ProbeArgs) -> Result<()> {
    let mut env = ToolchainEnv::from_env();
    if let Some(compiler) = args.compiler {
        env.cxx = Some(compiler);
    }

    let Some(compiler) = env.cxx_compiler() else {
        anyhow::bail!(
            "C++ compiler not found: {}",
            env.cxx.as_deref().unwrap_or("c++")
        );
    };

    println!("Compiler: {}", compiler.path().display());
    println!("Family:   {}", compiler.family());

    match compiler.find_runtime_dir(runtime_candidates()) {
        Some(found) => println!("Runtime:  {} (via {})", found.dir.display(), found.method),
        None => println!("Runtime:  not found"),
    }

    let flags = runtime_link_flags(&env);
    if flags.is_empty() {
        println!("Flags:    (none)");
    } else {
        println!("Flags:    {}", flags.join(" "));
    }

    Ok(())
}
