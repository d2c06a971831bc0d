fn main() {
    // ホストビルド(テスト)ではESP-IDF環境の出力は不要
    #[cfg(feature = "esp")]
    embuild::espidf::sysenv::output();
}
