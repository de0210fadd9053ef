//! Whole-plane integration: grant → mint → register → resolve.
//!
//! Test flow:
//! 1) Bring up a controller, a client allocator, and a location service on
//!    one keyspace.
//! 2) Mint fids until the allocator has installed a grant.
//! 3) Register the granted range in the location database, as the
//!    administrative path would after a grant commits.
//! 4) Resolve every minted fid back to its owner through a fresh client
//!    resolver and cross-check the locality hint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cleanup_dir, init_tracing, open_keyspace, test_dir};
use fidplane::config::{FldConfig, SeqConfig};
use fidplane::fid::FID_SEQ_NORMAL;
use fidplane::fld::{FldClient, FldService};
use fidplane::range::{RangeFlags, SeqRange};
use fidplane::seq::{FidMinter, SeqClient, SeqController};
use fidplane::transport::{FldChannel, LocalFldChannel, LocalSeqChannel, SeqChannel, SeqOp};

const NODE: u32 = 7;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn minted_fids_resolve_to_their_owner() {
    init_tracing();
    let dir = test_dir("end-to-end");
    let keyspace = open_keyspace(&dir);

    let controller = Arc::new(
        SeqController::open(
            keyspace.clone(),
            "ctl",
            SeqRange::new(FID_SEQ_NORMAL, FID_SEQ_NORMAL + 1_000_000, NODE, RangeFlags::Mdt),
            SeqConfig {
                super_width: 10_000,
                meta_width: 1_000,
                reserved_boundary: FID_SEQ_NORMAL,
                grant_timeout: Duration::from_secs(5),
            },
            None,
        )
        .expect("open controller"),
    );
    let channel: Arc<dyn SeqChannel> = Arc::new(LocalSeqChannel::new(controller));
    let allocator = Arc::new(SeqClient::new(
        channel,
        SeqOp::AllocMeta,
        Duration::from_secs(5),
    ));
    let minter = FidMinter::new(allocator.clone(), 16);

    let mut fids = Vec::new();
    for _ in 0..40 {
        fids.push(minter.mint_fid().await.expect("mint"));
    }

    // Register the allocator's grant the way the admin path would after
    // the grant committed.
    let service = Arc::new(FldService::open(keyspace, &FldConfig::default()).expect("open service"));
    let (granted, _) = allocator.current().await;
    service.create(granted).expect("register granted range");

    let fld_channel: Arc<dyn FldChannel> = Arc::new(LocalFldChannel::new(service));
    let resolver = FldClient::new(NODE, &FldConfig::default(), Some(fld_channel));
    for fid in &fids {
        assert!(fid.is_norm(), "minted fid {fid} in reserved space");
        assert_eq!(
            resolver.lookup_owner(fid.sequence).await.expect("resolve"),
            NODE,
            "fid {fid} resolved to the wrong node"
        );
        assert!(resolver.fid_is_local(fid));
    }

    cleanup_dir(&dir);
}
