use trackable;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// 発生し得るエラーの種別.
///
/// シミュレータ内で発生するエラーは全て非致命的であり、
/// エラーが返された後でもアロケータの状態は不変条件を満たしている.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 要求サイズを満たす空きブロックが存在しない.
    ///
    /// 空き容量の合計が要求サイズ以上であっても、
    /// それが複数の非連続なブロックに分散している場合(外部断片化)には、このエラーとなる.
    ///
    /// # 典型的な対応策
    ///
    /// - 不要な割当を解放する
    /// - 別の割当戦略で再試行する
    NoSpace,

    /// 未知の割当戦略が指定された.
    ///
    /// # 典型的な対応策
    ///
    /// - `first_fit`, `best_fit`, `worst_fit`のいずれかを指定する
    UnknownStrategy,

    /// 指定された所有者に対応する割当済みブロックが存在しない.
    UnknownOwner,

    /// 入力が不正.
    ///
    /// E.g., サイズがゼロ、既に割当中の所有者IDの再利用
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    InvalidInput,

    /// シミュレータのコマンドキューが詰まっている、等の過負荷状態.
    ///
    /// また、初期化処理中の場合にも、このエラーが返される.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者が時間をおいてリトライする
    SimulatorBusy,

    /// シミュレータ(の管理スレッド)が停止しており、利用不可能.
    ///
    /// # 典型的な対応策
    ///
    /// - シミュレータを再起動する
    SimulatorTerminated,

    /// 内部状態が不整合に陥っている.
    ///
    /// プログラムにバグがあることを示している.
    InconsistentState,

    /// その他エラー.
    Other,
}
impl trackable::error::ErrorKind for ErrorKind {}
