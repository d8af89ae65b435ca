//! 의존성 보강 -- 빌드 그래프 좌표를 엔진이 만든 의존성에 덧붙임
//!
//! 아티팩트 하나가 의존성 하나로 해석된 경우에만 좌표를 증거/식별자로 기록합니다.
//! 여러 개로 해석되면 어느 컴포넌트의 좌표인지 알 수 없으므로 그룹 참조만 남깁니다.

use cvegate_core::types::{Confidence, Dependency, Evidence, Identifier};

use crate::graph::ArtifactCoordinates;

/// 보강 증거의 출처
pub const EVIDENCE_SOURCE: &str = "build-graph";
/// 보강 증거의 필드명
pub const EVIDENCE_FIELD: &str = "coordinates";
/// 보강 식별자의 네임스페이스
pub const IDENTIFIER_NAMESPACE: &str = "maven";

/// 아티팩트 하나에서 생성된 의존성들을 보강합니다.
pub fn enrich(dependencies: &mut [Dependency], coordinates: &ArtifactCoordinates, group_name: &str) {
    match dependencies {
        [] => {}
        [single] => {
            single.add_evidence(coordinate_evidence(coordinates));
            if let Some(gav) = coordinates.gav() {
                single.add_identifier(Identifier {
                    namespace: IDENTIFIER_NAMESPACE.to_owned(),
                    value: gav,
                    confidence: Confidence::Highest,
                });
            }
            single.add_project_reference(group_name);
        }
        many => {
            for dependency in many.iter_mut() {
                dependency.add_project_reference(group_name);
            }
        }
    }
}

fn coordinate_evidence(coordinates: &ArtifactCoordinates) -> Evidence {
    let value = [&coordinates.group, &coordinates.name, &coordinates.version]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(":");

    Evidence {
        source: EVIDENCE_SOURCE.to_owned(),
        field: EVIDENCE_FIELD.to_owned(),
        value,
        confidence: Confidence::Highest,
    }
}
