//! Detection priority matrix over scripted probes

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rstest::rstest;

use farmlink_transport::{
    AdbDeviceInfo, DetectorProbes, MediaCandidate, TransportKind, detect_with,
};

struct Scripted {
    adb: bool,
    root_listable: bool,
    media: bool,
}

impl DetectorProbes for Scripted {
    fn adb_device(&self) -> Option<AdbDeviceInfo> {
        self.adb.then(|| AdbDeviceInfo {
            serial: "R58M123ABC".to_string(),
            model: "SM_A525F".to_string(),
        })
    }

    fn shell_can_list_root(&self, _device: &AdbDeviceInfo) -> bool {
        self.root_listable
    }

    fn media_device(&self) -> Option<MediaCandidate> {
        self.media.then(|| MediaCandidate {
            mount: PathBuf::from("/run/user/1000/gvfs/mtp:host=SAMSUNG"),
            identity: "mtp:host=SAMSUNG".to_string(),
            model: "SAMSUNG".to_string(),
        })
    }
}

#[rstest]
#[case::full_access(true, true, true, Some(TransportKind::Direct), true, true)]
#[case::shell_without_files(true, false, true, Some(TransportKind::MediaCopy), true, false)]
#[case::shell_only(true, false, false, Some(TransportKind::Direct), true, false)]
#[case::media_only(false, false, true, Some(TransportKind::MediaCopy), false, false)]
#[case::nothing(false, false, false, None, false, false)]
fn detection_priority(
    #[case] adb: bool,
    #[case] root_listable: bool,
    #[case] media: bool,
    #[case] expected_kind: Option<TransportKind>,
    #[case] commands: bool,
    #[case] direct_files: bool,
) {
    let probes = Scripted {
        adb,
        root_listable,
        media,
    };

    let transport = detect_with(&probes, false);
    assert_eq!(transport.as_ref().map(|t| t.kind()), expected_kind);
    if let Some(transport) = transport {
        assert_eq!(transport.can_execute_commands(), commands);
        assert_eq!(transport.can_access_files_directly(), direct_files);
    }
}

#[rstest]
#[case::direct("R58M123ABC")]
#[case::media_only_uses_mount_identity("mtp:host=SAMSUNG")]
fn identity_is_stable(#[case] expected: &str) {
    let adb = expected == "R58M123ABC";
    let probes = Scripted {
        adb,
        root_listable: adb,
        media: !adb,
    };
    let transport = detect_with(&probes, false).unwrap();
    assert_eq!(transport.identity(), expected);
}
