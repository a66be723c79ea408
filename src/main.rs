/*!
 * vixctl - Demo Entry Point
 *
 * Connects to a simulated host, lists its running VMs, opens and snapshots
 * each one, then closes the host and lets the cascade tear everything down.
 *
 * Usage: vixctl [connect-params.json]
 */

use std::error::Error;
use std::sync::Arc;
use tracing::{info, warn};

use vix_runtime::{
    init_tracing, ConnectParams, Host, Resource, Runtime, RuntimeConfig, SimulatedHost,
    SnapshotParams,
};

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let params = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "loading connection parameters");
            ConnectParams::from_json_file(path)?
        }
        None => ConnectParams::from_env()?,
    };
    let config = RuntimeConfig::from_env()?;

    let mut builder = SimulatedHost::builder()
        .with_running_vm("/vms/web-01/web-01.vmx")
        .with_running_vm("/vms/db-01/db-01.vmx")
        .with_vm("/vms/build/build.vmx");
    if let (Some(user), Some(password)) = (&params.username, &params.password) {
        builder = builder.with_credentials(user, password);
    }
    let runtime = Runtime::with_config(Arc::new(builder.build()), config);

    let host = Host::connect(&runtime, &params)?;
    let paths = host.find_running_vm_paths()?;
    info!(count = paths.len(), "found running VMs");

    let mut vms = Vec::with_capacity(paths.len());
    for path in &paths {
        let vm = host.open_vm(path)?;
        let tools = vm.wait_for_tools()?;
        let params = SnapshotParams::named("vixctl").with_description("taken by vixctl");
        let snapshot = vm.create_snapshot(&params)?;
        info!(vm = %vm.id(), path = %path, snapshot = %snapshot.id(), tools, "opened VM");
        vms.push((vm, snapshot));
    }

    for vm in host.open_vms()? {
        println!("host {} -> vm {}", host.id(), vm);
    }
    for (vm, snapshot) in &vms {
        println!("vm {} -> snapshot {} ({:?})", vm.id(), snapshot.id(), snapshot.display_name()?);
    }

    let report = host.close()?;
    if !report.is_clean() {
        warn!(%report, "host closed with suppressed failures");
    }
    println!("{}", report);

    let still_open = vms
        .iter()
        .filter(|(vm, snapshot)| !vm.is_closed() || !snapshot.is_closed())
        .count();
    info!(still_open, live = runtime.live_resources(), "done");
    Ok(())
}
