//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `authbridge_core` linkage.
//! - Drive one adapter through register, deliver and destroy with a printing
//!   listener, keeping output deterministic.

use authbridge_core::{
    AuthSessionResponse, BridgeContext, ListenerError, SteamId, UserCallbackListener,
    ValidateAuthTicketResponse,
};
use std::process::ExitCode;
use std::sync::Arc;

struct PrintingListener;

impl UserCallbackListener for PrintingListener {
    fn on_validate_auth_ticket(
        &self,
        steam_id: SteamId,
        response: AuthSessionResponse,
        owner_steam_id: SteamId,
    ) -> Result<(), ListenerError> {
        println!(
            "validate auth ticket: steam_id={} account_id={} response={} owner={}",
            steam_id,
            steam_id.account_id(),
            response.as_str(),
            owner_steam_id
        );
        Ok(())
    }
}

fn main() -> ExitCode {
    println!("authbridge_core ping={}", authbridge_core::ping());
    println!("authbridge_core version={}", authbridge_core::core_version());

    let context = BridgeContext::default();
    let listener_id = context.user_listeners().insert(Arc::new(PrintingListener));
    let adapter_id = match context.register_user_callback(listener_id) {
        Ok(id) => id,
        Err(err) => {
            eprintln!("register failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    // The second record carries an unknown response code and is dropped.
    for (steam_id, code) in [(42_u64, 0_i32), (43, 99), (44, 6)] {
        let payload = ValidateAuthTicketResponse {
            steam_id: SteamId::new(steam_id),
            response_code: code,
            owner_steam_id: SteamId::new(steam_id),
        };
        if let Err(err) = context.post_validate_auth_ticket(payload) {
            eprintln!("post failed: {err}");
            return ExitCode::FAILURE;
        }
    }
    context.run_callbacks();

    if let Some(stats) = context.adapter_stats(adapter_id) {
        println!(
            "adapter stats: delivered={} dropped={}",
            stats.delivered, stats.dropped
        );
    }
    context.destroy_adapter(adapter_id);
    context.shutdown();
    println!(
        "listener released={}",
        context.user_listeners().finalize(listener_id)
    );
    ExitCode::SUCCESS
}
